// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start-a-background-command endpoint: heartbeat frames every second
//! while the supervisor waits for readiness, then one terminal frame.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use agent_wire::{write_message, Reply};

use super::{ListenCtx, ReplyStream, RpcError};
use crate::state::StartOutcome;

pub(crate) async fn handle<W>(
    cwd: String,
    cmd: String,
    ctx: &ListenCtx,
    stream: &ReplyStream<W>,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    // `finished` is observed under the writer lock, so once the terminal
    // frame is queued no further beat can be written.
    let finished = CancellationToken::new();
    let client_gone = CancellationToken::new();
    tokio::spawn(emit_heartbeats(stream.clone(), finished.clone(), client_gone.clone()));

    let outcome = ctx
        .supervisor
        .start_and_wait_ready(PathBuf::from(cwd), cmd, client_gone)
        .await;

    finished.cancel();

    match outcome {
        Ok(StartOutcome::Ready) => {
            stream.send(&Reply::Ok).await?;
            Ok(())
        }
        Ok(StartOutcome::Exited { output, message }) => {
            stream.send(&Reply::StartError { output, message }).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Send one beat per second until the handler finishes. A failed write
/// means the client is gone; the supervisor is told to abort the start.
async fn emit_heartbeats<W>(
    stream: ReplyStream<W>,
    finished: CancellationToken,
    client_gone: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        {
            // Check-and-send must happen under one lock acquisition:
            // between a bare check and a later send the handler could
            // write the terminal frame.
            let mut writer = stream.writer().lock().await;
            if finished.is_cancelled() {
                return;
            }
            if write_message(&mut *writer, &Reply::Heartbeat).await.is_err() {
                client_gone.cancel();
                return;
            }
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

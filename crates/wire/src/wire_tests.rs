// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::{Reply, Request};

#[tokio::test]
async fn frame_round_trips_through_a_duplex_pipe() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    let request = Request::TryToStartLongRunningProcess {
        cwd: "/app".to_string(),
        cmd: "npm start".to_string(),
    };
    write_message(&mut client, &request).await.unwrap();

    let received: Request = read_message(&mut server).await.unwrap();
    assert_eq!(received, request);
}

#[test]
fn encode_prefixes_payload_length_big_endian() {
    let frame = encode(&Reply::Heartbeat).unwrap();
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    assert_eq!(len as usize, frame.len() - 4);

    let decoded: Reply = decode(&frame[4..]).unwrap();
    assert_eq!(decoded, Reply::Heartbeat);
}

#[tokio::test]
async fn closed_pipe_reports_connection_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let err = read_message::<Reply, _>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_prefix_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    tokio::io::AsyncWriteExt::write_all(&mut client, &u32::MAX.to_be_bytes())
        .await
        .unwrap();

    let err = read_message::<Reply, _>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::TooLarge(_)));
}

#[tokio::test]
async fn silent_client_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_request(&mut server, Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[test]
fn terminal_frames_are_classified() {
    assert!(!Reply::Heartbeat.is_terminal());
    assert!(!Reply::LogLine { line: String::new() }.is_terminal());
    assert!(!Reply::LogLineHeader { line: String::new() }.is_terminal());
    assert!(Reply::Ok.is_terminal());
    assert!(Reply::Error { message: String::new() }.is_terminal());
    assert!(Reply::GithubPublicKey { content: String::new() }.is_terminal());
    assert!(Reply::StartError { output: String::new(), message: String::new() }.is_terminal());
}

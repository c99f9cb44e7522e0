// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::{Repository, ServedPorts};

/// Request from the control-plane client to the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// First-boot provisioning: user, shell, toolchain, repositories.
    InitInstance {
        env_name: String,
        env_name_slug: String,
        user_email: String,
        user_full_name: String,
        repositories: Vec<Repository>,
    },

    /// Install language runtimes. An `IndexMap` because install order is
    /// the request's insertion order (with ruby forced last).
    InstallRuntimes { runtimes: IndexMap<String, String> },

    /// Reconcile the reverse proxy with the declared served ports.
    ReconcileServedPortsState { served_ports: ServedPorts },

    /// Answer an ACME/DNS reachability probe for `domain` with a static
    /// `unique_id` body on port 80.
    CheckDomainReachability {
        served_ports: ServedPorts,
        domain: String,
        unique_id: String,
    },

    /// Start a background command and wait for it to open a listener.
    TryToStartLongRunningProcess { cwd: String, cmd: String },
}

/// One frame of a streaming reply.
///
/// `LogLine`, `LogLineHeader`, and `Heartbeat` are intermediate frames;
/// the rest are terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Reply {
    /// One line of merged subprocess output.
    LogLine { line: String },

    /// Section header preceding a runtime's install output.
    LogLineHeader { line: String },

    /// Liveness beat while a long operation proceeds.
    Heartbeat,

    /// Terminal frame of `InitInstance`: the generated GitHub deploy key.
    GithubPublicKey { content: String },

    /// Terminal success frame.
    Ok,

    /// Terminal frame of `TryToStartLongRunningProcess` when the command
    /// exited instead of becoming ready.
    StartError { output: String, message: String },

    /// Terminal failure frame.
    Error { message: String },
}

impl Reply {
    /// Whether this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Reply::LogLine { .. } | Reply::LogLineHeader { .. } | Reply::Heartbeat)
    }
}

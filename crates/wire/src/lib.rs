// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC protocol for agent communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. A
//! connection carries exactly one `Request` frame, answered by a stream
//! of `Reply` frames ending with a terminal variant.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod types;
mod wire;

pub use request::{Reply, Request};
pub use types::{Binding, BindingType, Repository, ServedPorts};
pub use wire::{decode, encode, read_message, read_request, write_message, ProtocolError};

#[cfg(test)]
mod property_tests;

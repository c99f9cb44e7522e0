// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public-key authorization against per-user authorized-keys files.

use std::path::PathBuf;

use russh::keys::PublicKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read authorized keys file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed authorized key entry: {0}")]
    Parse(#[from] russh::keys::ssh_key::Error),
}

/// A username allowed to connect, and where its accepted keys live.
#[derive(Debug, Clone)]
pub struct AuthorizedUser {
    pub username: String,
    pub authorized_keys_path: PathBuf,
}

pub struct Authenticator {
    authorized_users: Vec<AuthorizedUser>,
}

impl Authenticator {
    pub fn new(authorized_users: Vec<AuthorizedUser>) -> Self {
        Self { authorized_users }
    }

    /// Whether `offered` is one of the keys authorized for `username`.
    ///
    /// Unknown usernames are denied without touching the filesystem. Key
    /// comparison is on the key material, ignoring comments.
    pub fn is_authorized(&self, username: &str, offered: &PublicKey) -> Result<bool, AuthError> {
        let Some(user) = self.authorized_users.iter().find(|user| user.username == username)
        else {
            return Ok(false);
        };

        let contents = std::fs::read_to_string(&user.authorized_keys_path)?;
        let authorized_keys = parse_authorized_keys(&contents)?;

        Ok(authorized_keys.iter().any(|key| key.key_data() == offered.key_data()))
    }
}

/// Parse an authorized-keys file: one key per line, blank lines and
/// comments skipped.
pub(crate) fn parse_authorized_keys(contents: &str) -> Result<Vec<PublicKey>, AuthError> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| PublicKey::from_openssh(line).map_err(AuthError::from))
        .collect()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

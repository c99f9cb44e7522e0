// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn vscode_workspace_file_is_slugged() {
    assert_eq!(
        vscode_workspace_file("My Env"),
        PathBuf::from("/eleven/vscode/my-env.code-workspace")
    );
}

#[test]
fn reserved_ports_cover_platform_listeners() {
    for port in ["22", "2200", "80", "443", "2019"] {
        assert!(RESERVED_PORTS.contains(&port));
    }
}

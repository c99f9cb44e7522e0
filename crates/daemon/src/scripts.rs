// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded shell scripts: instance bootstrap and per-runtime installers.

pub(crate) const INIT_INSTANCE: &str = include_str!("scripts/init_instance.sh");

/// Installer script for a runtime, or `None` for unknown runtimes.
pub(crate) fn runtime_install_script(runtime: &str) -> Option<&'static str> {
    match runtime {
        "go" => Some(include_str!("scripts/runtimes/go.sh")),
        "ruby" => Some(include_str!("scripts/runtimes/ruby.sh")),
        "rust" => Some(include_str!("scripts/runtimes/rust.sh")),
        "python" => Some(include_str!("scripts/runtimes/python.sh")),
        "java" => Some(include_str!("scripts/runtimes/java.sh")),
        "clang" => Some(include_str!("scripts/runtimes/clang.sh")),
        "docker" => Some(include_str!("scripts/runtimes/docker.sh")),
        _ => None,
    }
}

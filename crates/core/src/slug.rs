// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slugify names for use as directory and file name components.
//!
//! The same function shapes environment slugs, placeholder workspace
//! directories, and repository clone paths, so the generated filesystem
//! layout matches what the control plane derives on its side.

/// Slugify a string: lowercase, replace runs of non-alphanumeric
/// characters with a single hyphen, trim leading/trailing hyphens.
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();

    let mut slug = String::with_capacity(lower.len());
    let mut last_was_hyphen = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    slug.trim_matches('-').to_string()
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;

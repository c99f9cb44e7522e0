// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn repo(owner: &str, name: &str) -> agent_wire::Repository {
    agent_wire::Repository { owner: owner.to_string(), name: name.to_string() }
}

#[test]
fn single_owner_paths_use_the_repo_name() {
    let repos = vec![repo("acme", "api"), repo("acme", "Web_App")];
    let owners = distinct_owner_count(&repos);

    assert_eq!(owners, 1);
    assert_eq!(
        repo_dir_path(&repos[0], owners),
        PathBuf::from("/home/eleven/workspace/api")
    );
    assert_eq!(
        repo_dir_path(&repos[1], owners),
        PathBuf::from("/home/eleven/workspace/web-app")
    );
}

#[test]
fn multiple_owners_disambiguate_with_the_owner() {
    let repos = vec![repo("acme", "api"), repo("other", "api")];
    let owners = distinct_owner_count(&repos);

    assert_eq!(owners, 2);
    assert_eq!(
        repo_dir_path(&repos[0], owners),
        PathBuf::from("/home/eleven/workspace/acme-api")
    );
    assert_eq!(
        repo_dir_path(&repos[1], owners),
        PathBuf::from("/home/eleven/workspace/other-api")
    );
}

#[test]
fn owner_and_name_are_slugged_together() {
    let repos = vec![repo("Acme Inc", "My.App"), repo("other", "api")];
    let owners = distinct_owner_count(&repos);

    assert_eq!(
        repo_dir_path(&repos[0], owners),
        PathBuf::from("/home/eleven/workspace/acme-inc-my-app")
    );
}

#[test]
fn distinct_owner_count_deduplicates() {
    let repos = vec![repo("acme", "a"), repo("acme", "b"), repo("other", "c")];
    assert_eq!(distinct_owner_count(&repos), 2);
}

#[test]
fn no_repositories_means_no_owners() {
    assert_eq!(distinct_owner_count(&[]), 0);
}

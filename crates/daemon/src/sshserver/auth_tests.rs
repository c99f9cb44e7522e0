// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const KEY_ONE: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIPVEax9Ir9eS2eafSH0aOHoRuV3UwFNdrMaPRPnQYbkA dev1";
const KEY_TWO: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBQn4MPucnKxfyZ0Rf9QlH+L/bDcxwdDx0oaF0oDiM49 dev2";
const KEY_OTHER: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAINNAd0xwGC17nlBV4idAWKp4YnB7ua5nkpfpn0RwqOnn dev3";

fn key(openssh: &str) -> PublicKey {
    PublicKey::from_openssh(openssh).unwrap()
}

fn authenticator_with_keys(keys: &str) -> (Authenticator, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("authorized_keys");
    std::fs::write(&path, keys).unwrap();

    let authenticator = Authenticator::new(vec![AuthorizedUser {
        username: "eleven".to_string(),
        authorized_keys_path: path,
    }]);
    (authenticator, dir)
}

#[test]
fn accepts_a_listed_key_for_a_listed_user() {
    let (authenticator, _dir) = authenticator_with_keys(&format!("{KEY_ONE}\n{KEY_TWO}\n"));

    assert!(authenticator.is_authorized("eleven", &key(KEY_ONE)).unwrap());
    assert!(authenticator.is_authorized("eleven", &key(KEY_TWO)).unwrap());
}

#[test]
fn rejects_a_key_that_is_not_listed() {
    let (authenticator, _dir) = authenticator_with_keys(&format!("{KEY_ONE}\n{KEY_TWO}\n"));

    assert!(!authenticator.is_authorized("eleven", &key(KEY_OTHER)).unwrap());
}

#[test]
fn rejects_unknown_users_without_reading_any_file() {
    let authenticator = Authenticator::new(vec![AuthorizedUser {
        username: "eleven".to_string(),
        authorized_keys_path: PathBuf::from("/nonexistent/authorized_keys"),
    }]);

    // An unknown user is denied before the (missing) file would error.
    assert!(!authenticator.is_authorized("root", &key(KEY_ONE)).unwrap());
}

#[test]
fn missing_keys_file_for_a_listed_user_is_an_error() {
    let authenticator = Authenticator::new(vec![AuthorizedUser {
        username: "eleven".to_string(),
        authorized_keys_path: PathBuf::from("/nonexistent/authorized_keys"),
    }]);

    assert!(authenticator.is_authorized("eleven", &key(KEY_ONE)).is_err());
}

#[test]
fn comment_differences_do_not_break_the_match() {
    let (authenticator, _dir) = authenticator_with_keys(KEY_ONE);

    let same_key_other_comment = KEY_ONE.replace(" dev1", " someone@elsewhere");
    assert!(authenticator.is_authorized("eleven", &key(&same_key_other_comment)).unwrap());
}

#[test]
fn parses_multiple_keys_and_skips_blanks_and_comments() {
    let contents = format!("# managed by the control plane\n\n{KEY_ONE}\n{KEY_TWO}\n");
    let keys = parse_authorized_keys(&contents).unwrap();
    assert_eq!(keys.len(), 2);
}

#[test]
fn malformed_entries_are_an_error() {
    assert!(parse_authorized_keys("not a key\n").is_err());
}

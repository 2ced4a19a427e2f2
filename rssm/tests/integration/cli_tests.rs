use std::process::Command;

use crate::common::{assert_contains, init_test_logging};

#[test]
fn test_rssm_help_lists_subcommands() {
    init_test_logging();
    crate::test_log!("TEST START: test_rssm_help_lists_subcommands");

    let output = Command::new(env!("CARGO_BIN_EXE_rssm"))
        .arg("--help")
        .output()
        .expect("Failed to run rssm --help");

    assert_eq!(output.status.code(), Some(0), "rssm --help failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains(&stdout, "exec");
    assert_contains(&stdout, "copy");
    assert_contains(&stdout, "--region");
    crate::test_log!("TEST PASS: test_rssm_help_lists_subcommands");
}

#[test]
fn test_missing_required_flag_is_usage_error() {
    init_test_logging();
    crate::test_log!("TEST START: test_missing_required_flag_is_usage_error");

    let output = Command::new(env!("CARGO_BIN_EXE_rssm"))
        .args(["copy", "--target", "i-0123", "--local-file", "./a.conf"])
        .output()
        .expect("Failed to run rssm copy");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "--remote-file");
    crate::test_log!("TEST PASS: test_missing_required_flag_is_usage_error");
}

#[test]
fn test_exec_without_command_exits_one() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_without_command_exits_one");

    let output = Command::new(env!("CARGO_BIN_EXE_rssm"))
        .args(["exec", "--target", "i-0123456789abcdef0"])
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "--command");
    assert!(output.stdout.is_empty());
    crate::test_log!("TEST PASS: test_exec_without_command_exits_one");
}

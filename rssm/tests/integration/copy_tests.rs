use crate::common::{FakeAws, assert_contains, init_test_logging};

const INSTANCE: &str = "i-0123456789abcdef0";

#[test]
fn test_copy_sends_encoded_file() {
    init_test_logging();
    crate::test_log!("TEST START: test_copy_sends_encoded_file");

    let aws = FakeAws::new();
    let local = aws.local_file("nginx.conf", "server {\n    listen 80;\n}\n");
    let output = aws
        .rssm()
        .args(["copy", "--target", INSTANCE, "--remote-file", "/etc/nginx/nginx.conf", "--sudo"])
        .arg("--local-file")
        .arg(&local)
        .env("FAKE_SSM_STDOUT", "File successfully transferred")
        .output()
        .expect("Failed to run rssm copy");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "copy failed: {stdout}");
    assert_contains(&stdout, "=== FILE TRANSFER INITIATED (");
    assert_contains(&stdout, "File Name           : nginx.conf");
    assert_contains(&stdout, "File Size           : 0 KB");
    assert_contains(&stdout, "FILE TRANSFER COMMAND SENT SUCCESSFULLY");
    assert_contains(&stdout, "Destination File    : /etc/nginx/nginx.conf");
    assert_contains(&stdout, "FILE TRANSFER COMPLETED SUCCESSFULLY");

    let log = std::fs::read_to_string(&aws.log).expect("fake aws was not called");
    assert_contains(&log, "c2VydmVyIHsKICAgIGxpc3RlbiA4MDsKfQo=");
    assert_contains(&log, "sudo mkdir -p");
    assert_contains(&log, "/etc/nginx");
    crate::test_log!("TEST PASS: test_copy_sends_encoded_file");
}

#[test]
fn test_copy_missing_local_file() {
    init_test_logging();
    crate::test_log!("TEST START: test_copy_missing_local_file");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["copy", "-t", INSTANCE, "-r", "/tmp/x.conf"])
        .arg("-l")
        .arg(aws.dir.path().join("missing.conf"))
        .output()
        .expect("Failed to run rssm copy");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "=== ERROR: General Operation Error ===");
    assert_contains(&stderr, "local file exists");
    assert!(aws.calls().is_empty(), "no remote call expected");
    crate::test_log!("TEST PASS: test_copy_missing_local_file");
}

#[test]
fn test_copy_rejects_unsafe_remote_path() {
    init_test_logging();
    crate::test_log!("TEST START: test_copy_rejects_unsafe_remote_path");

    let aws = FakeAws::new();
    let local = aws.local_file("app.env", "A=1\n");
    let output = aws
        .rssm()
        .args(["copy", "-t", INSTANCE, "-r", "/etc/$(whoami).env"])
        .arg("-l")
        .arg(&local)
        .output()
        .expect("Failed to run rssm copy");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "Invalid remote path");
    assert!(aws.calls().is_empty());
    crate::test_log!("TEST PASS: test_copy_rejects_unsafe_remote_path");
}

#[test]
fn test_copy_large_file() {
    init_test_logging();
    crate::test_log!("TEST START: test_copy_large_file");

    let aws = FakeAws::new();
    let local = aws.local_file("bundle.js", &"a".repeat(120 * 1024));
    let output = aws
        .rssm()
        .args(["copy", "-t", INSTANCE, "-r", "/opt/app/bundle.js"])
        .arg("-l")
        .arg(&local)
        .output()
        .expect("Failed to run rssm copy");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(0), "copy failed: {stdout}\n{stderr}");
    assert_contains(&stdout, "File Size           : 120 KB");
    assert_contains(&stdout, "FILE TRANSFER COMPLETED SUCCESSFULLY");
    assert_eq!(aws.calls_to("send-command"), 1);

    let log = std::fs::read_to_string(&aws.log).expect("fake aws was not called");
    assert_contains(&log, &"YWFh".repeat(1000));
    crate::test_log!("TEST PASS: test_copy_large_file");
}

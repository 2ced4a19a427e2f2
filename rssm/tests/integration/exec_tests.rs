use crate::common::{FakeAws, assert_contains, assert_not_contains, init_test_logging};

const INSTANCE: &str = "i-0123456789abcdef0";

#[test]
fn test_exec_success_renders_report() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_success_renders_report");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["exec", "--target", INSTANCE, "--command", "uptime", "--sudo"])
        .env("FAKE_SSM_STDOUT", "hello-from-instance")
        .output()
        .expect("Failed to run rssm exec");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "exec failed: {stdout}");
    assert_contains(&stdout, "=== SENDING COMMAND (");
    assert_contains(&stdout, "Using Sudo          : Yes (via flag)");
    assert_contains(&stdout, "Command ID          : cmd-fake-1");
    assert_contains(&stdout, "Status: Success");
    assert_contains(&stdout, "Output (1 lines):\nhello-from-instance");
    assert_contains(&stdout, "EXECUTION COMPLETED SUCCESSFULLY");

    let calls = aws.calls();
    assert_contains(&calls[0], "ssm send-command --region ap-southeast-1");
    assert_contains(&calls[0], "--cli-input-json file:///dev/stdin");
    assert_contains(&calls[0], r#""DocumentName":"AWS-RunShellScript""#);
    assert_contains(&calls[0], &format!(r#""InstanceIds":["{INSTANCE}"]"#));
    assert_contains(&calls[0], r#""Parameters":{"commands":["sudo uptime"]}"#);
    assert_eq!(aws.calls_to("get-command-invocation"), 1);
    crate::test_log!("TEST PASS: test_exec_success_renders_report");
}

#[test]
fn test_exec_region_and_profile_reach_cli() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_region_and_profile_reach_cli");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["--region", "eu-west-1", "--profile", "ops"])
        .args(["exec", "-t", INSTANCE, "-c", "true", "--no-wait"])
        .output()
        .expect("Failed to run rssm exec");

    assert!(output.status.success());
    let calls = aws.calls();
    assert_contains(&calls[0], "--region eu-west-1 --profile ops");
    crate::test_log!("TEST PASS: test_exec_region_and_profile_reach_cli");
}

#[test]
fn test_exec_no_wait_skips_polling() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_no_wait_skips_polling");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["exec", "--target", INSTANCE, "--command", "reboot", "--no-wait"])
        .output()
        .expect("Failed to run rssm exec");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_contains(&stdout, "SUCCESS - COMMAND INITIATED");
    assert_not_contains(&stdout, "Waiting for the result");
    assert_eq!(aws.calls_to("get-command-invocation"), 0);
    crate::test_log!("TEST PASS: test_exec_no_wait_skips_polling");
}

#[test]
fn test_exec_failed_status_exits_nonzero() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_failed_status_exits_nonzero");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["exec", "--target", INSTANCE, "--command", "false"])
        .env("FAKE_SSM_STATUS", "Failed")
        .env("FAKE_SSM_STDERR", "boom")
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stdout, "Status: Failed");
    assert_contains(&stdout, "--- Standard Error ---\nboom");
    assert_not_contains(&stdout, "COMPLETED SUCCESSFULLY");
    assert_contains(&stderr, "=== ERROR: General Operation Error ===");
    assert_contains(&stderr, "Command execution completed with non-success status: Failed");
    assert_contains(&stderr, "SUGGESTION: Check the output above");
    crate::test_log!("TEST PASS: test_exec_failed_status_exits_nonzero");
}

#[test]
fn test_exec_service_error_is_classified() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_service_error_is_classified");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["exec", "--target", "i-bad", "--command", "ls"])
        .env(
            "FAKE_SSM_SEND_ERROR",
            "An error occurred (InvalidInstanceId) when calling the SendCommand operation: Instances [[i-bad]] not in a valid state",
        )
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "=== ERROR: AWS SSM Instance Error ===");
    assert_contains(&stderr, "Error executing SSM command");
    assert_contains(&stderr, "Instance ID invalid or not managed by SSM");
    assert_contains(&stderr, "SSM Agent");
    assert_eq!(aws.calls_to("get-command-invocation"), 0);
    crate::test_log!("TEST PASS: test_exec_service_error_is_classified");
}

#[test]
fn test_exec_json_report() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_json_report");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["--json", "exec", "--target", INSTANCE, "--command", "hostname"])
        .env("FAKE_SSM_STDOUT", "ip-10-0-0-12")
        .output()
        .expect("Failed to run rssm exec");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
    assert_eq!(report["command_id"], "cmd-fake-1");
    assert_eq!(report["status"], "Success");
    assert_eq!(report["output"], "ip-10-0-0-12");
    assert_eq!(report["window"]["start"], "2026-10-16T02:00:00.123Z");
    crate::test_log!("TEST PASS: test_exec_json_report");
}

#[test]
fn test_exec_json_error_object() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_json_error_object");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["--json", "exec", "--target", INSTANCE, "--command", "ls"])
        .env(
            "FAKE_SSM_SEND_ERROR",
            "An error occurred (ThrottlingException) when calling the SendCommand operation (reached max retries: 4): Rate exceeded",
        )
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON error");
    assert_eq!(body["error"]["code"], "RSSM-E105");
    assert_eq!(body["error"]["message"], "Error executing SSM command");
    assert!(!body["error"]["suggestion"].as_str().unwrap_or("").is_empty());
    crate::test_log!("TEST PASS: test_exec_json_error_object");
}

#[test]
fn test_exec_json_failed_status_is_one_document() {
    init_test_logging();
    crate::test_log!("TEST START: test_exec_json_failed_status_is_one_document");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["--json", "exec", "--target", INSTANCE, "--command", "false"])
        .env("FAKE_SSM_STATUS", "Failed")
        .env("FAKE_SSM_STDERR", "exit status 1")
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a single JSON document");
    assert_eq!(body["command_id"], "cmd-fake-1");
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["error"]["code"], "RSSM-E500");
    assert_eq!(
        body["error"]["message"],
        "Command execution completed with non-success status: Failed"
    );
    assert_contains(body["error"]["suggestion"].as_str().unwrap_or(""), "Check the output above");
    crate::test_log!("TEST PASS: test_exec_json_failed_status_is_one_document");
}

#[test]
fn test_missing_aws_binary() {
    init_test_logging();
    crate::test_log!("TEST START: test_missing_aws_binary");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .env("RSSM_AWS_BIN", aws.dir.path().join("no-such-aws"))
        .args(["exec", "--target", INSTANCE, "--command", "ls"])
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_contains(&stderr, "General Operation Error");
    assert_contains(&stderr, "RSSM_AWS_BIN");
    crate::test_log!("TEST PASS: test_missing_aws_binary");
}

#[test]
fn test_invalid_region_flag_rejected_before_any_call() {
    init_test_logging();
    crate::test_log!("TEST START: test_invalid_region_flag_rejected_before_any_call");

    let aws = FakeAws::new();
    let output = aws
        .rssm()
        .args(["--region", "not a region", "exec", "-t", INSTANCE, "-c", "ls"])
        .output()
        .expect("Failed to run rssm exec");

    assert_eq!(output.status.code(), Some(1));
    assert!(aws.calls().is_empty());
    crate::test_log!("TEST PASS: test_invalid_region_flag_rejected_before_any_call");
}

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Stand-in for the `aws` executable.
///
/// `send-command` answers with a fixed command id and `get-command-invocation`
/// with a snapshot built from `FAKE_SSM_*` variables. Every invocation's
/// arguments are appended to `calls.log`, followed on the same line by the
/// request read from stdin for `send-command`.
const SCRIPT: &str = r#"#!/bin/sh
case "$2" in
  send-command)
    printf '%s %s\n' "$*" "$(cat)" >> "$FAKE_SSM_LOG"
    if [ -n "$FAKE_SSM_SEND_ERROR" ]; then
      printf '\n%s\n' "$FAKE_SSM_SEND_ERROR" >&2
      exit 254
    fi
    printf '{"Command": {"CommandId": "cmd-fake-1", "DocumentName": "AWS-RunShellScript"}}\n'
    ;;
  get-command-invocation)
    printf '%s\n' "$*" >> "$FAKE_SSM_LOG"
    printf '{"CommandId": "cmd-fake-1", "Status": "%s", "StandardOutputContent": "%s", "StandardErrorContent": "%s", "ExecutionStartDateTime": "2026-10-16T02:00:00.123Z"}\n' \
      "${FAKE_SSM_STATUS:-Success}" "${FAKE_SSM_STDOUT:-}" "${FAKE_SSM_STDERR:-}"
    ;;
  *)
    printf '%s\n' "$*" >> "$FAKE_SSM_LOG"
    echo "unexpected operation: $2" >&2
    exit 2
    ;;
esac
"#;

pub struct FakeAws {
    pub dir: TempDir,
    pub script: PathBuf,
    pub log: PathBuf,
}

impl FakeAws {
    pub fn new() -> Self {
        crate::test_log!("FIXTURE: Creating fake aws executable");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let script = dir.path().join("aws");
        let log = dir.path().join("calls.log");
        fs::write(&script, SCRIPT).expect("Failed to write fake aws");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
                .expect("Failed to mark fake aws executable");
        }

        Self { dir, script, log }
    }

    /// `rssm` wired to this fake, with a clean `RSSM_*` environment.
    pub fn rssm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rssm"));
        for var in [
            "RSSM_REGION",
            "RSSM_PROFILE",
            "RSSM_LOG_LEVEL",
            "RSSM_LOG_FORMAT",
            "RSSM_LOG_FILE",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("RSSM_AWS_BIN", &self.script);
        cmd.env("FAKE_SSM_LOG", &self.log);
        cmd
    }

    /// Argument lines the fake received, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        let needle = format!("ssm {operation} ");
        self.calls().iter().filter(|c| c.starts_with(&needle)).count()
    }

    /// Write a local file for transfer tests.
    pub fn local_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write local file");
        path
    }
}

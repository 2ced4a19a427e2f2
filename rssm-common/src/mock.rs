//! Scripted `SsmApi` for tests.
//!
//! Submit and status responses are queued up front; every call is recorded
//! so tests can assert on how many RPCs the engine issued. Once the status
//! queue is exhausted the last queued snapshot is repeated.

use crate::client::{ClientError, InvocationSnapshot, SsmApi, SubmitResponse};
use crate::types::Target;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A call the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Send {
        target: String,
        document: String,
        payload: String,
    },
    Status {
        command_id: String,
        target: String,
    },
}

type StatusStep = Result<InvocationSnapshot, ClientError>;

#[derive(Debug)]
pub struct MockSsm {
    submit: Mutex<Option<Result<SubmitResponse, ClientError>>>,
    statuses: Mutex<VecDeque<StatusStep>>,
    last: Mutex<Option<InvocationSnapshot>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockSsm {
    pub fn builder() -> MockSsmBuilder {
        MockSsmBuilder::default()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn status_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Status { .. }))
            .count()
    }

    pub fn send_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Send { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_status(&self) -> StatusStep {
        let step = self.statuses.lock().ok().and_then(|mut q| q.pop_front());
        match step {
            Some(Ok(snapshot)) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = Some(snapshot.clone());
                }
                Ok(snapshot)
            }
            Some(Err(err)) => Err(err),
            None => self
                .last
                .lock()
                .ok()
                .and_then(|last| last.clone())
                .ok_or_else(|| ClientError::other("mock status queue is empty")),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockSsmBuilder {
    submit: Option<Result<SubmitResponse, ClientError>>,
    statuses: VecDeque<StatusStep>,
}

impl MockSsmBuilder {
    /// Submission succeeds with this command id.
    pub fn command_id(mut self, id: impl Into<String>) -> Self {
        self.submit = Some(Ok(SubmitResponse {
            command_id: Some(id.into()),
        }));
        self
    }

    /// Submission succeeds but the response carries no command id.
    pub fn missing_command_id(mut self) -> Self {
        self.submit = Some(Ok(SubmitResponse { command_id: None }));
        self
    }

    pub fn submit_error(mut self, err: ClientError) -> Self {
        self.submit = Some(Err(err));
        self
    }

    /// Queue a status snapshot.
    pub fn status(mut self, snapshot: InvocationSnapshot) -> Self {
        self.statuses.push_back(Ok(snapshot));
        self
    }

    /// Queue a bare status string.
    pub fn statuses(mut self, statuses: &[&str]) -> Self {
        for status in statuses {
            self.statuses
                .push_back(Ok(InvocationSnapshot::with_status(*status)));
        }
        self
    }

    /// Queue a failing status call.
    pub fn status_error(mut self, err: ClientError) -> Self {
        self.statuses.push_back(Err(err));
        self
    }

    pub fn build(self) -> MockSsm {
        MockSsm {
            submit: Mutex::new(self.submit),
            statuses: Mutex::new(self.statuses),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl SsmApi for MockSsm {
    async fn send_command(
        &self,
        target: &Target,
        document: &str,
        payload: &str,
    ) -> Result<SubmitResponse, ClientError> {
        self.record(MockCall::Send {
            target: target.to_string(),
            document: document.to_string(),
            payload: payload.to_string(),
        });
        self.submit
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .unwrap_or_else(|| Err(ClientError::other("mock submit response not configured")))
    }

    async fn get_invocation(
        &self,
        command_id: &str,
        target: &Target,
    ) -> Result<InvocationSnapshot, ClientError> {
        self.record(MockCall::Status {
            command_id: command_id.to_string(),
            target: target.to_string(),
        });
        self.next_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_and_repeats_last_status() {
        let mock = MockSsm::builder()
            .command_id("cmd-1")
            .statuses(&["InProgress"])
            .build();
        let target = Target::new("i-0123");

        let submitted = mock.send_command(&target, "AWS-RunShellScript", "uptime").await;
        assert_eq!(submitted.unwrap().command_id.as_deref(), Some("cmd-1"));

        for _ in 0..3 {
            let snap = mock.get_invocation("cmd-1", &target).await.unwrap();
            assert_eq!(snap.status.as_deref(), Some("InProgress"));
        }

        assert_eq!(mock.send_calls(), 1);
        assert_eq!(mock.status_calls(), 3);
        assert_eq!(
            mock.calls()[0],
            MockCall::Send {
                target: "i-0123".to_string(),
                document: "AWS-RunShellScript".to_string(),
                payload: "uptime".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_mock_empty_queue_errors() {
        let mock = MockSsm::builder().build();
        let target = Target::new("i-0123");
        assert!(mock.send_command(&target, "doc", "x").await.is_err());
        assert!(mock.get_invocation("id", &target).await.is_err());
    }
}

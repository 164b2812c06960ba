use serde::{Deserialize, Serialize};

/// One request to the remote execution service.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub language: String,
    pub source: String,
    pub stdin: String,
}

/// Outcome of a single execution. Transient, never persisted.
///
/// Callers distinguish "ran and produced wrong output" from "failed to run"
/// by the presence of `error_message`; `error_line` is advisory editor
/// highlighting only and must never influence pass/fail.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_line: Option<u32>,
}

impl ExecutionResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            error_message: None,
            error_line: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            error_message: Some(message.into()),
            error_line: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Per-case outcome with both raw strings retained for display.
#[derive(Debug, Clone, Serialize)]
pub struct TestVerdict {
    pub test_case_id: String,
    pub passed: bool,
    pub actual_output: String,
    pub expected_output: String,
    pub hidden: bool,
}

/// Aggregate outcome of one harness run, verdicts in test-case order.
#[derive(Debug, Clone, Serialize)]
pub struct SessionVerdict {
    pub verdicts: Vec<TestVerdict>,
    pub passed_all: bool,
}

impl SessionVerdict {
    /// An empty verdict list passes vacuously.
    pub fn from_verdicts(verdicts: Vec<TestVerdict>) -> Self {
        let passed_all = verdicts.iter().all(|v| v.passed);
        Self {
            verdicts,
            passed_all,
        }
    }
}

/// Learner-facing verdict: hidden cases report pass/fail only, their
/// input/output text is withheld.
#[derive(Debug, Serialize)]
pub struct TestVerdictView {
    pub test_case_id: String,
    pub passed: bool,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl From<&TestVerdict> for TestVerdictView {
    fn from(v: &TestVerdict) -> Self {
        if v.hidden {
            Self {
                test_case_id: v.test_case_id.clone(),
                passed: v.passed,
                hidden: true,
                actual_output: None,
                expected_output: None,
            }
        } else {
            Self {
                test_case_id: v.test_case_id.clone(),
                passed: v.passed,
                hidden: false,
                actual_output: Some(v.actual_output.clone()),
                expected_output: Some(v.expected_output.clone()),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunTestsResponse {
    pub session_id: String,
    pub passed_all: bool,
    pub verdicts: Vec<TestVerdictView>,
}

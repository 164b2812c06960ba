use crate::models::execution::{ExecutionRequest, SessionVerdict, TestVerdict};
use crate::models::problem::ProblemSpec;
use crate::services::execution_client::ExecutionBackend;
use crate::utils::normalize::outputs_match;

/// Drives the execution backend across a problem's test cases and
/// aggregates a verdict.
///
/// Cases run strictly sequentially, in their defined order: the backing
/// sandbox is a shared, rate-limited resource, and partial results must be
/// reportable in submission order. A failed execution records a failing
/// verdict carrying the raw error text as the case's actual output and
/// never aborts the remaining cases.
pub async fn run(
    problem: &ProblemSpec,
    language: &str,
    source: &str,
    backend: &dyn ExecutionBackend,
) -> SessionVerdict {
    let mut verdicts = Vec::with_capacity(problem.test_cases.len());

    for case in &problem.test_cases {
        let request = ExecutionRequest {
            language: language.to_string(),
            source: source.to_string(),
            stdin: case.input.clone(),
        };
        let result = backend.execute(&request).await;

        let verdict = match result.error_message {
            Some(error) => {
                tracing::debug!(
                    "Test case {} failed to run: {}",
                    case.id,
                    error.chars().take(200).collect::<String>()
                );
                TestVerdict {
                    test_case_id: case.id.clone(),
                    passed: false,
                    actual_output: error,
                    expected_output: case.expected_output.clone(),
                    hidden: case.hidden,
                }
            }
            None => {
                let passed = outputs_match(&result.stdout, &case.expected_output);
                TestVerdict {
                    test_case_id: case.id.clone(),
                    passed,
                    actual_output: result.stdout,
                    expected_output: case.expected_output.clone(),
                    hidden: case.hidden,
                }
            }
        };
        verdicts.push(verdict);
    }

    SessionVerdict::from_verdicts(verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::execution::ExecutionResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Maps stdin to a scripted result; anything unscripted errors.
    struct ScriptedBackend {
        by_stdin: HashMap<String, ExecutionResult>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(entries: Vec<(&str, ExecutionResult)>) -> Self {
            Self {
                by_stdin: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
            self.calls.lock().unwrap().push(request.stdin.clone());
            self.by_stdin
                .get(&request.stdin)
                .cloned()
                .unwrap_or_else(|| ExecutionResult::failed("execution timed out"))
        }
    }

    fn problem(cases: serde_json::Value) -> ProblemSpec {
        serde_json::from_value(serde_json::json!({ "id": "p1", "test_cases": cases })).unwrap()
    }

    #[tokio::test]
    async fn empty_case_list_passes_vacuously() {
        let backend = ScriptedBackend::new(vec![]);
        let verdict = run(&problem(serde_json::json!([])), "python", "print()", &backend).await;

        assert!(verdict.passed_all);
        assert!(verdict.verdicts.is_empty());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verdicts_preserve_case_order() {
        let backend = ScriptedBackend::new(vec![
            ("a", ExecutionResult::ok("1")),
            ("b", ExecutionResult::ok("2")),
            ("c", ExecutionResult::ok("3")),
        ]);
        let cases = serde_json::json!([
            { "id": "t1", "input": "a", "expected_output": "1" },
            { "id": "t2", "input": "b", "expected_output": "2" },
            { "id": "t3", "input": "c", "expected_output": "3" },
        ]);

        let verdict = run(&problem(cases), "python", "src", &backend).await;
        let ids: Vec<_> = verdict.verdicts.iter().map(|v| v.test_case_id.as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        assert_eq!(*backend.calls.lock().unwrap(), ["a", "b", "c"]);
        assert!(verdict.passed_all);
    }

    #[tokio::test]
    async fn comparison_uses_the_normalizer() {
        let backend = ScriptedBackend::new(vec![
            ("3,4", ExecutionResult::ok("7 ")),
            ("x", ExecutionResult::ok("1  2 3")),
            ("y", ExecutionResult::ok("hello")),
        ]);
        let cases = serde_json::json!([
            { "id": "t1", "input": "3,4", "expected_output": "7" },
            { "id": "t2", "input": "x", "expected_output": "1,2,3" },
            { "id": "t3", "input": "y", "expected_output": "Hello" },
        ]);

        let verdict = run(&problem(cases), "python", "src", &backend).await;
        assert!(verdict.verdicts[0].passed);
        assert!(verdict.verdicts[1].passed);
        assert!(!verdict.verdicts[2].passed);
        assert!(!verdict.passed_all);
        // raw output retained for display
        assert_eq!(verdict.verdicts[0].actual_output, "7 ");
    }

    #[tokio::test]
    async fn execution_error_becomes_failing_verdict_without_aborting() {
        let backend = ScriptedBackend::new(vec![
            ("a", ExecutionResult::failed("division by zero")),
            ("b", ExecutionResult::ok("2")),
        ]);
        let cases = serde_json::json!([
            { "id": "t1", "input": "a", "expected_output": "1" },
            { "id": "t2", "input": "b", "expected_output": "2" },
        ]);

        let verdict = run(&problem(cases), "python", "src", &backend).await;
        assert!(!verdict.verdicts[0].passed);
        assert_eq!(verdict.verdicts[0].actual_output, "division by zero");
        // remaining cases still ran
        assert!(verdict.verdicts[1].passed);
        assert_eq!(backend.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unscripted_case_is_caught_as_synthetic_failure() {
        let backend = ScriptedBackend::new(vec![("a", ExecutionResult::ok("1"))]);
        let cases = serde_json::json!([
            { "id": "t1", "input": "a", "expected_output": "1" },
            { "id": "t2", "input": "unknown", "expected_output": "2" },
        ]);

        let verdict = run(&problem(cases), "python", "src", &backend).await;
        assert!(verdict.verdicts[0].passed);
        assert!(!verdict.verdicts[1].passed);
        assert_eq!(verdict.verdicts[1].actual_output, "execution timed out");
    }
}

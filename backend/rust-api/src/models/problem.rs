use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable description of one problem, loaded read-only from the content
/// collaborator at session creation. Every field except `id` is lenient:
/// a malformed or partial payload degrades to defaults instead of failing
/// the whole session load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    /// Starter source keyed by language identifier ("python", "cpp", ...).
    #[serde(default)]
    pub default_source: HashMap<String, String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
}

impl ProblemSpec {
    /// Repairs what lenient deserialization let through: hint ordinals are
    /// positional by definition, and an empty id falls back to the id the
    /// problem was requested under.
    pub fn sanitize(mut self, requested_id: &str) -> Self {
        if self.id.is_empty() {
            self.id = requested_id.to_string();
        }
        for (idx, hint) in self.hints.iter_mut().enumerate() {
            hint.ordinal = idx as u32;
        }
        self
    }

    pub fn visible_test_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.test_cases.iter().filter(|c| !c.hidden)
    }

    pub fn hidden_test_count(&self) -> usize {
        self.test_cases.iter().filter(|c| c.hidden).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
    /// Hidden cases are withheld from learner-facing payloads but still
    /// participate in scoring.
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    /// 0-based position; unlock time derives from it, nothing is persisted.
    #[serde(default)]
    pub ordinal: u32,
    #[serde(default)]
    pub kind: HintKind,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    #[default]
    Text,
    Video,
}

impl HintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HintKind::Text => "text",
            HintKind::Video => "video",
        }
    }
}

/// Learner-facing projection of a ProblemSpec: hidden test cases are
/// reduced to a count, hint contents stay behind the disclosure schedule.
#[derive(Debug, Serialize)]
pub struct ProblemView {
    pub id: String,
    pub prompt: String,
    pub default_source: HashMap<String, String>,
    pub sample_test_cases: Vec<SampleTestCase>,
    pub hidden_test_count: usize,
    pub hint_count: usize,
    pub time_limit_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SampleTestCase {
    pub id: String,
    pub input: String,
    pub expected_output: String,
}

impl From<&ProblemSpec> for ProblemView {
    fn from(spec: &ProblemSpec) -> Self {
        Self {
            id: spec.id.clone(),
            prompt: spec.prompt.clone(),
            default_source: spec.default_source.clone(),
            sample_test_cases: spec
                .visible_test_cases()
                .map(|c| SampleTestCase {
                    id: c.id.clone(),
                    input: c.input.clone(),
                    expected_output: c.expected_output.clone(),
                })
                .collect(),
            hidden_test_count: spec.hidden_test_count(),
            hint_count: spec.hints.len(),
            time_limit_seconds: spec.time_limit_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_reindexes_hint_ordinals_and_backfills_id() {
        let spec: ProblemSpec = serde_json::from_value(serde_json::json!({
            "hints": [
                { "ordinal": 7, "content": "first" },
                { "content": "second" },
            ]
        }))
        .unwrap();

        let spec = spec.sanitize("two-sum");
        assert_eq!(spec.id, "two-sum");
        assert_eq!(spec.hints[0].ordinal, 0);
        assert_eq!(spec.hints[1].ordinal, 1);
        assert_eq!(spec.hints[1].kind, HintKind::Text);
    }

    #[test]
    fn malformed_payload_degrades_to_defaults() {
        let spec: ProblemSpec =
            serde_json::from_value(serde_json::json!({ "id": "p1" })).unwrap();
        assert!(spec.test_cases.is_empty());
        assert!(spec.hints.is_empty());
        assert!(spec.prompt.is_empty());
        assert_eq!(spec.time_limit_seconds, None);
    }

    #[test]
    fn view_redacts_hidden_cases() {
        let spec: ProblemSpec = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "test_cases": [
                { "id": "t1", "input": "1 2", "expected_output": "3" },
                { "id": "t2", "input": "4 5", "expected_output": "9", "hidden": true },
            ]
        }))
        .unwrap();

        let view = ProblemView::from(&spec);
        assert_eq!(view.sample_test_cases.len(), 1);
        assert_eq!(view.sample_test_cases[0].id, "t1");
        assert_eq!(view.hidden_test_count, 1);
    }
}

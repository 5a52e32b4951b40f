//! Core task types shared by the daemon and the cache.

use crate::fingerprint::{fingerprint, Fingerprint};
use crate::task_text::{MathTask, TaskTextError};
use serde::{Deserialize, Serialize};

/// Persisted (fingerprint, task_text, answer) triple
///
/// Immutable once stored: the cache never updates a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub fingerprint: Fingerprint,
    pub task_text: String,
    pub answer: String,
}

impl TaskRecord {
    /// Build a record, deriving the fingerprint from the text
    pub fn new(task_text: impl Into<String>, answer: impl Into<String>) -> Self {
        let task_text = task_text.into();
        Self {
            fingerprint: fingerprint(&task_text),
            task_text,
            answer: answer.into(),
        }
    }
}

/// A task with its answer, as returned to HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTask {
    #[serde(rename = "task")]
    pub task_text: String,
    pub answer: String,
}

impl From<TaskRecord> for GeneratedTask {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_text: record.task_text,
            answer: record.answer,
        }
    }
}

/// Which answer engine a subject is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectDomain {
    Math,
    General,
}

impl SubjectDomain {
    /// Math if the subject contains any of the keywords (case-insensitive)
    pub fn classify<S: AsRef<str>>(subject: &str, math_keywords: &[S]) -> Self {
        let subject = subject.to_lowercase();
        let is_math = math_keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .any(|k| !k.is_empty() && subject.contains(&k));

        if is_math {
            SubjectDomain::Math
        } else {
            SubjectDomain::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectDomain::Math => "math",
            SubjectDomain::General => "general",
        }
    }
}

/// A task classified once at generation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Equation extracted from `<prompt>: <equation>` text
    Math(MathTask),
    /// Free-form question for the inference engine
    General { question: String },
}

impl TaskKind {
    /// Classify task text for an already-decided subject domain
    pub fn from_text(domain: SubjectDomain, task_text: &str) -> Result<Self, TaskTextError> {
        match domain {
            SubjectDomain::Math => Ok(TaskKind::Math(MathTask::parse(task_text)?)),
            SubjectDomain::General => Ok(TaskKind::General {
                question: task_text.trim().to_string(),
            }),
        }
    }

    pub fn domain(&self) -> SubjectDomain {
        match self {
            TaskKind::Math(_) => SubjectDomain::Math,
            TaskKind::General { .. } => SubjectDomain::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_math_keywords() {
        let keywords = ["математика", "math"];
        assert_eq!(SubjectDomain::classify("математика", &keywords), SubjectDomain::Math);
        assert_eq!(
            SubjectDomain::classify("Профильная Математика", &keywords),
            SubjectDomain::Math
        );
        assert_eq!(SubjectDomain::classify("Mathematics", &keywords), SubjectDomain::Math);
        assert_eq!(SubjectDomain::classify("история", &keywords), SubjectDomain::General);
    }

    #[test]
    fn test_classify_ignores_blank_keywords() {
        assert_eq!(SubjectDomain::classify("history", &["", "  "]), SubjectDomain::General);
    }

    #[test]
    fn test_record_derives_fingerprint() {
        let record = TaskRecord::new("Solve: x = 1", "[1]");
        assert_eq!(record.fingerprint, fingerprint("Solve: x = 1"));
    }

    #[test]
    fn test_generated_task_json_shape() {
        let task = GeneratedTask {
            task_text: "Q".to_string(),
            answer: "A".to_string(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json, serde_json::json!({"task": "Q", "answer": "A"}));
    }

    #[test]
    fn test_task_kind_general_keeps_question() {
        let kind = TaskKind::from_text(SubjectDomain::General, "  Who wrote it?  ").unwrap();
        assert_eq!(
            kind,
            TaskKind::General {
                question: "Who wrote it?".to_string()
            }
        );
        assert_eq!(kind.domain(), SubjectDomain::General);
    }

    #[test]
    fn test_task_kind_math_requires_grammar() {
        assert!(TaskKind::from_text(SubjectDomain::Math, "2x = 4").is_err());
        let kind = TaskKind::from_text(SubjectDomain::Math, "Solve: 2x = 4").unwrap();
        assert_eq!(kind.domain(), SubjectDomain::Math);
    }
}

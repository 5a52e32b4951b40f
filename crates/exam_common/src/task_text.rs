//! Math task-text grammar
//!
//! ```text
//! task     := prompt ":" equation
//! prompt   := any text, non-empty after trim (may contain ':')
//! equation := expr [ "=" expr ]        ; a bare expr means expr = 0
//! ```
//!
//! The delimiter is the LAST colon, so `"Задание 5: Решите уравнение: x^2 = 4"`
//! yields the equation `x^2 = 4`. The equation may use at most one variable,
//! which must be a single ASCII letter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grammar violations in a math task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskTextError {
    #[error("task text has no ':' delimiter before the equation")]
    MissingDelimiter,

    #[error("task prompt before ':' is empty")]
    EmptyPrompt,

    #[error("equation after ':' is empty")]
    EmptyEquation,

    #[error("unexpected character {0:?} in equation")]
    InvalidCharacter(char),

    #[error("equation contains more than one '='")]
    MultipleEquals,

    #[error("equation uses more than one variable: {0}")]
    MultipleVariables(String),
}

/// An equation task split into its prompt and equation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathTask {
    pub prompt: String,
    /// Normalized equation text handed to the solver
    pub equation: String,
    pub variable: Option<char>,
}

impl MathTask {
    pub fn parse(task_text: &str) -> Result<Self, TaskTextError> {
        let text = normalize(task_text);
        let idx = text.rfind(':').ok_or(TaskTextError::MissingDelimiter)?;

        let prompt = text[..idx].trim();
        if prompt.is_empty() {
            return Err(TaskTextError::EmptyPrompt);
        }

        let equation = text[idx + 1..].trim();
        if equation.is_empty() {
            return Err(TaskTextError::EmptyEquation);
        }

        let mut variable: Option<char> = None;
        let mut equals = 0;
        for c in equation.chars() {
            match c {
                '0'..='9' | '.' | '+' | '-' | '*' | '/' | '^' | '(' | ')' => {}
                '=' => equals += 1,
                c if c.is_whitespace() => {}
                c if c.is_ascii_alphabetic() => match variable {
                    None => variable = Some(c),
                    Some(v) if v == c => {}
                    Some(v) => {
                        return Err(TaskTextError::MultipleVariables(format!("{}, {}", v, c)))
                    }
                },
                other => return Err(TaskTextError::InvalidCharacter(other)),
            }
        }

        if equals > 1 {
            return Err(TaskTextError::MultipleEquals);
        }

        Ok(Self {
            prompt: prompt.to_string(),
            equation: equation.to_string(),
            variable,
        })
    }
}

/// Map typographic operators to their ASCII forms
fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2212}' | '\u{2013}' => '-',
            '\u{00d7}' | '\u{00b7}' | '\u{22c5}' => '*',
            other => other,
        })
        .collect()
}

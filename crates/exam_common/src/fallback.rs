//! Deterministic placeholder tasks used when the task source yields nothing.
//!
//! Each placeholder must stay answerable by its domain's engine: the math
//! one follows the `<prompt>: <equation>` grammar.

use crate::types::SubjectDomain;

/// Math placeholder
pub const MATH_FALLBACK_TASK: &str = "Решите уравнение: 2x^2 + 3x - 5 = 0";

/// General-subject placeholder
pub const GENERAL_FALLBACK_TASK: &str =
    "Ответьте на вопрос: в каком году была принята Конституция Российской Федерации?";

/// Placeholder task for a subject domain
pub fn fallback_task(domain: SubjectDomain) -> &'static str {
    match domain {
        SubjectDomain::Math => MATH_FALLBACK_TASK,
        SubjectDomain::General => GENERAL_FALLBACK_TASK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{PolynomialSolver, SymbolicSolver};
    use crate::task_text::MathTask;

    #[test]
    fn test_math_fallback_is_solvable() {
        let task = MathTask::parse(fallback_task(SubjectDomain::Math)).unwrap();
        let answer = PolynomialSolver.solve(&task.equation).unwrap().canonical();
        assert_eq!(answer, "[-2.5, 1]");
    }

    #[test]
    fn test_fallbacks_are_stable() {
        assert_eq!(fallback_task(SubjectDomain::Math), MATH_FALLBACK_TASK);
        assert_eq!(fallback_task(SubjectDomain::General), GENERAL_FALLBACK_TASK);
    }
}

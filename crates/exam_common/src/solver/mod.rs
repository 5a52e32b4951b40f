//! Symbolic solver for single-variable polynomial equations
//!
//! The solver is CPU-bound and synchronous. Callers should not hold any
//! shared lock while it runs.

mod parser;
mod polynomial;

pub use polynomial::{Polynomial, MAX_DEGREE};

use thiserror::Error;

/// Canonical answer for an equation with no real roots
pub const NO_SOLUTION: &str = "no solution";

/// Canonical answer for an identity
pub const ALL_REALS: &str = "all real numbers";

/// Solver failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unsupported equation: {0}")]
    Unsupported(String),
}

/// Solution set of an equation
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    /// Real roots, ascending, without duplicates
    Roots(Vec<f64>),
    NoSolution,
    AllReals,
}

impl Solution {
    /// Canonical string form stored in the cache
    ///
    /// Roots render as `[-2.5, 1]`; the empty set renders as `no solution`.
    pub fn canonical(&self) -> String {
        match self {
            Solution::Roots(roots) if !roots.is_empty() => {
                let mut rendered: Vec<String> = roots.iter().map(|r| format_root(*r)).collect();
                rendered.dedup();
                format!("[{}]", rendered.join(", "))
            }
            Solution::Roots(_) | Solution::NoSolution => NO_SOLUTION.to_string(),
            Solution::AllReals => ALL_REALS.to_string(),
        }
    }
}

/// Symbolic equation solver
pub trait SymbolicSolver: Send + Sync {
    fn solve(&self, equation: &str) -> Result<Solution, SolveError>;
}

/// Built-in solver for polynomial equations up to [`MAX_DEGREE`]
#[derive(Debug, Default, Clone, Copy)]
pub struct PolynomialSolver;

impl SymbolicSolver for PolynomialSolver {
    fn solve(&self, equation: &str) -> Result<Solution, SolveError> {
        let poly = parser::parse_equation(equation)?;
        if !poly.is_finite() {
            return Err(SolveError::Unsupported(
                "coefficients overflow the number range".into(),
            ));
        }

        if let Some(constant) = poly.as_constant() {
            return Ok(if constant == 0.0 {
                Solution::AllReals
            } else {
                Solution::NoSolution
            });
        }

        let roots = poly.real_roots();
        if roots.is_empty() {
            Ok(Solution::NoSolution)
        } else {
            Ok(Solution::Roots(roots))
        }
    }
}

/// Up to 6 decimals, trailing zeros trimmed, no negative zero
fn format_root(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.6}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(eq: &str) -> String {
        PolynomialSolver.solve(eq).unwrap().canonical()
    }

    #[test]
    fn test_reference_quadratic() {
        assert_eq!(solve("2x^2 + 3x - 5 = 0"), "[-2.5, 1]");
    }

    #[test]
    fn test_reference_roots_satisfy_equation() {
        let solution = PolynomialSolver.solve("2x^2 + 3x - 5 = 0").unwrap();
        let Solution::Roots(roots) = solution else {
            panic!("expected roots");
        };
        for x in roots {
            assert!((2.0 * x * x + 3.0 * x - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_and_double_root() {
        assert_eq!(solve("3x - 6 = 0"), "[2]");
        assert_eq!(solve("x^2 - 2x + 1 = 0"), "[1]");
    }

    #[test]
    fn test_no_solution_is_an_answer() {
        assert_eq!(solve("x^2 + 1 = 0"), NO_SOLUTION);
        assert_eq!(solve("x + 1 = x + 2"), NO_SOLUTION);
    }

    #[test]
    fn test_identity() {
        assert_eq!(solve("2(x + 1) = 2x + 2"), ALL_REALS);
    }

    #[test]
    fn test_irrational_roots_are_rounded() {
        assert_eq!(solve("x^2 = 2"), "[-1.414214, 1.414214]");
    }

    #[test]
    fn test_cubic() {
        assert_eq!(solve("x^3 - 6x^2 + 11x - 6 = 0"), "[1, 2, 3]");
        assert_eq!(solve("x^3 = 8"), "[2]");
    }

    #[test]
    fn test_large_constants() {
        assert_eq!(solve("x + 1000000000000 = 0"), "[-1000000000000]");
        assert_eq!(solve("x^2 = 1000000000000"), "[-1000000, 1000000]");
    }

    #[test]
    fn test_small_coefficients() {
        assert_eq!(solve("0.0000001x^2 = 0.0000001"), "[-1, 1]");
        assert_eq!(solve("0.000000000001 = 0"), NO_SOLUTION);
        assert_eq!(solve("0.1 + 0.2 = 0.3"), ALL_REALS);
    }

    #[test]
    fn test_roots_satisfy_scaled_equations() {
        for eq in ["x^2 = 1000000000000", "0.0000001x^2 = 0.0000001", "x^3 = 8000000000"] {
            let poly = parser::parse_equation(eq).unwrap();
            let Solution::Roots(roots) = PolynomialSolver.solve(eq).unwrap() else {
                panic!("expected roots for {}", eq);
            };
            let scale = poly.coeffs().iter().fold(0.0_f64, |m, c| m.max(c.abs()));
            for x in roots {
                assert!(poly.eval(x).abs() <= 1e-9 * scale, "{} at {}", eq, x);
            }
        }
    }

    #[test]
    fn test_overflowing_literal_is_rejected() {
        let eq = format!("x = {}", "9".repeat(400));
        assert!(matches!(PolynomialSolver.solve(&eq), Err(SolveError::Syntax(_))));
        assert!(matches!(
            PolynomialSolver.solve("x = 10000000000^40"),
            Err(SolveError::Unsupported(_))
        ));
    }

    #[test]
    fn test_format_root() {
        assert_eq!(format_root(-0.0000001), "0");
        assert_eq!(format_root(-2.5), "-2.5");
        assert_eq!(format_root(10.0), "10");
        assert_eq!(format_root(0.125), "0.125");
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(PolynomialSolver.solve("2x^2 +").is_err());
    }
}

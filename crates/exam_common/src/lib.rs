//! Exam Common - task types, fingerprints, the equation solver and the task cache.
//!
//! Shared by the `examd` daemon and its tests.

pub mod cache;
pub mod fallback;
pub mod fingerprint;
pub mod solver;
pub mod task_text;
pub mod types;

pub use cache::{CacheError, CacheLookup, TaskCache};
pub use fallback::fallback_task;
pub use fingerprint::{fingerprint, Fingerprint};
pub use solver::{PolynomialSolver, Solution, SolveError, SymbolicSolver};
pub use task_text::{MathTask, TaskTextError};
pub use types::*;

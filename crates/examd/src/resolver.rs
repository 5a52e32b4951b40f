//! Answer Resolver
//!
//! Routes a task to the equation solver or the inference engine. The route
//! is decided once, from the subject, when the task is classified into a
//! [`TaskKind`].

use crate::config::{InferenceConfig, ResolverConfig};
use crate::error::ResolveError;
use crate::inference::InferenceEngine;
use exam_common::{SubjectDomain, SymbolicSolver, TaskKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct AnswerResolver {
    solver: Arc<dyn SymbolicSolver>,
    engine: Arc<dyn InferenceEngine>,
    math_keywords: Vec<String>,
    context: String,
    inference_timeout: Duration,
}

impl AnswerResolver {
    pub fn new(
        solver: Arc<dyn SymbolicSolver>,
        engine: Arc<dyn InferenceEngine>,
        resolver: &ResolverConfig,
        inference: &InferenceConfig,
    ) -> Self {
        Self {
            solver,
            engine,
            math_keywords: resolver.math_keywords.clone(),
            context: inference.context.clone(),
            inference_timeout: inference.timeout(),
        }
    }

    /// Domain for a subject
    pub fn classify(&self, subject: &str) -> SubjectDomain {
        SubjectDomain::classify(subject, &self.math_keywords)
    }

    /// Classify the task text for the subject and resolve it
    pub async fn resolve(&self, subject: &str, task_text: &str) -> Result<String, ResolveError> {
        let kind = TaskKind::from_text(self.classify(subject), task_text)?;
        self.resolve_task(&kind).await
    }

    /// Resolve an already classified task
    pub async fn resolve_task(&self, kind: &TaskKind) -> Result<String, ResolveError> {
        match kind {
            TaskKind::Math(task) => {
                match task.variable {
                    Some(var) => debug!("Solving '{}' for {}", task.equation, var),
                    None => debug!("Checking constant equation '{}'", task.equation),
                }
                let solution = self.solver.solve(&task.equation)?;
                Ok(solution.canonical())
            }
            TaskKind::General { question } => {
                let call = self.engine.answer(question, &self.context);
                match tokio::time::timeout(self.inference_timeout, call).await {
                    Ok(answer) => Ok(answer?),
                    Err(_) => Err(ResolveError::Timeout(self.inference_timeout)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use async_trait::async_trait;
    use exam_common::PolynomialSolver;

    struct FixedEngine(Result<String, EngineError>);

    #[async_trait]
    impl InferenceEngine for FixedEngine {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, EngineError> {
            self.0.clone()
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl InferenceEngine for SlowEngine {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, EngineError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    fn resolver(engine: Arc<dyn InferenceEngine>) -> AnswerResolver {
        AnswerResolver::new(
            Arc::new(PolynomialSolver),
            engine,
            &ResolverConfig::default(),
            &InferenceConfig {
                timeout_secs: 5,
                ..InferenceConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_math_subject_uses_solver() {
        let r = resolver(Arc::new(FixedEngine(Err(EngineError::Unavailable("off".into())))));
        let answer = r
            .resolve("mathematics", "Solve: 2x^2 + 3x - 5 = 0")
            .await
            .unwrap();
        assert_eq!(answer, "[-2.5, 1]");
    }

    #[tokio::test]
    async fn test_no_solution_is_answer() {
        let r = resolver(Arc::new(FixedEngine(Ok("unused".into()))));
        let answer = r.resolve("математика", "Решите: x^2 + 1 = 0").await.unwrap();
        assert_eq!(answer, "no solution");
    }

    #[tokio::test]
    async fn test_constant_equation_without_variable() {
        let r = resolver(Arc::new(FixedEngine(Ok("unused".into()))));
        let answer = r.resolve("math", "Check: 2 + 2 = 4").await.unwrap();
        assert_eq!(answer, "all real numbers");
    }

    #[tokio::test]
    async fn test_math_without_delimiter_is_malformed() {
        let r = resolver(Arc::new(FixedEngine(Ok("unused".into()))));
        let err = r.resolve("mathematics", "2x^2 + 3x - 5 = 0").await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedTask(_)));
    }

    #[tokio::test]
    async fn test_unparseable_math_is_malformed() {
        let r = resolver(Arc::new(FixedEngine(Ok("unused".into()))));
        let err = r.resolve("mathematics", "Solve: 2x^ = 1").await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedTask(_)));
    }

    #[tokio::test]
    async fn test_general_subject_uses_engine() {
        let r = resolver(Arc::new(FixedEngine(Ok("Tolstoy".into()))));
        let answer = r.resolve("литература", "Who wrote War and Peace?").await.unwrap();
        assert_eq!(answer, "Tolstoy");
    }

    #[tokio::test]
    async fn test_engine_failure_is_unavailable() {
        let r = resolver(Arc::new(FixedEngine(Err(EngineError::Unavailable("down".into())))));
        let err = r.resolve("history", "When?").await.unwrap_err();
        assert_eq!(err, ResolveError::EngineUnavailable("down".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_engine_times_out() {
        let r = resolver(Arc::new(SlowEngine));
        let err = r.resolve("history", "When?").await.unwrap_err();
        assert_eq!(err, ResolveError::Timeout(Duration::from_secs(5)));
    }
}

//! examd - exam task daemon
//!
//! Serves practice exam tasks with answers over HTTP. Each distinct task
//! text is answered once and cached in SQLite; clients are rate limited.

pub mod config;
pub mod error;
pub mod generator;
pub mod inference;
pub mod network;
pub mod provider;
pub mod resolver;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::{ApiError, EngineError, ErrorKind, GenerationError, ProviderError, ResolveError};
pub use generator::TaskGenerator;
pub use inference::{InferenceEngine, OllamaEngine};
pub use network::{Metrics, RateLimiter};
pub use provider::{HtmlTaskSource, TaskSource};
pub use resolver::AnswerResolver;
pub use server::{build_router, AppState};

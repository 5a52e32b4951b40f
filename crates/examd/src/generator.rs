//! Task Generator
//!
//! Obtains a task for a subject, answers it at most once per distinct task
//! text, and persists the pair. Source and cache failures degrade; only a
//! failure to resolve an answer is returned to the caller.

use crate::error::GenerationError;
use crate::network::metrics::Metrics;
use crate::provider::TaskSource;
use crate::resolver::AnswerResolver;
use exam_common::{fallback_task, fingerprint, CacheLookup, GeneratedTask, TaskCache, TaskRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where the answer of a served task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Cache,
    Resolved,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Cache => "cache",
            AnswerSource::Resolved => "resolved",
        }
    }
}

pub struct TaskGenerator {
    source: Arc<dyn TaskSource>,
    resolver: Arc<AnswerResolver>,
    cache: TaskCache,
    metrics: Metrics,
    fetch_timeout: Duration,
}

impl TaskGenerator {
    pub fn new(
        source: Arc<dyn TaskSource>,
        resolver: Arc<AnswerResolver>,
        cache: TaskCache,
        metrics: Metrics,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            resolver,
            cache,
            metrics,
            fetch_timeout,
        }
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    /// Produce a task and its answer for `subject`
    pub async fn generate(&self, subject: &str) -> Result<GeneratedTask, GenerationError> {
        let started = Instant::now();
        let result = self.generate_inner(subject).await;
        self.metrics
            .generation_seconds
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok((task, source)) => {
                self.metrics.record_served(source.as_str());
                Ok(task)
            }
            Err(e) => {
                error!("Task generation for '{}' failed: {}", subject, e);
                self.metrics.record_failure(e.kind().as_str());
                Err(e)
            }
        }
    }

    async fn generate_inner(
        &self,
        subject: &str,
    ) -> Result<(GeneratedTask, AnswerSource), GenerationError> {
        let task_text = self.acquire_task_text(subject).await;
        let fp = fingerprint(&task_text);

        match self.cache.get_or_reserve(&fp).await {
            Ok(CacheLookup::Hit(record)) => {
                debug!("Cache hit for task {}", fp.short());
                return Ok((record.into(), AnswerSource::Cache));
            }
            Ok(CacheLookup::Miss) => debug!("Cache miss for task {}", fp.short()),
            Err(e) => {
                warn!("Cache read failed, resolving task {} anyway: {}", fp.short(), e);
                self.metrics.record_cache_error("read");
            }
        }

        let answer = self.resolver.resolve(subject, &task_text).await?;
        let record = TaskRecord::new(task_text, answer);

        match self.cache.insert_if_absent(&record).await {
            Ok(true) => {
                info!("Stored task {} ({})", fp.short(), subject);
                Ok((record.into(), AnswerSource::Resolved))
            }
            Ok(false) => Ok((self.stored_or_own(record).await, AnswerSource::Cache)),
            Err(e) => {
                warn!("Cache write failed, task {} not persisted: {}", fp.short(), e);
                self.metrics.record_cache_error("write");
                Ok((record.into(), AnswerSource::Resolved))
            }
        }
    }

    /// After losing an insert race, prefer the record that won
    async fn stored_or_own(&self, own: TaskRecord) -> GeneratedTask {
        match self.cache.get(&own.fingerprint).await {
            Ok(Some(stored)) => {
                debug!("Task {} was stored concurrently", own.fingerprint.short());
                stored.into()
            }
            Ok(None) => {
                warn!(
                    "Task {} reported present but not found on re-read",
                    own.fingerprint.short()
                );
                own.into()
            }
            Err(e) => {
                warn!(
                    "Cache re-read for task {} failed: {}",
                    own.fingerprint.short(),
                    e
                );
                self.metrics.record_cache_error("read");
                own.into()
            }
        }
    }

    /// First task offered by the source, or the placeholder for the subject
    async fn acquire_task_text(&self, subject: &str) -> String {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch(subject)).await;

        let reason = match fetched {
            Ok(Ok(tasks)) => match tasks.into_iter().next() {
                Some(task) => return task,
                None => "no tasks found".to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("fetch timed out after {:?}", self.fetch_timeout),
        };

        let domain = self.resolver.classify(subject);
        warn!(
            "Task source gave nothing for '{}' ({}), using {} placeholder",
            subject,
            reason,
            domain.as_str()
        );
        self.metrics.provider_fallbacks_total.inc();
        fallback_task(domain).to_string()
    }
}

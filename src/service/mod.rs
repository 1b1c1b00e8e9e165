//! Caching sample service.
//!
//! [`GenerateService`] wraps problem synthesis and the solve orchestrator
//! with an at-most-once-compute cache keyed by the normalized request. Both
//! successes and failures are cached. [`routes`] exposes it over HTTP.

pub mod routes;
pub mod schemas;

use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::error::SolveError;
use crate::metrics;
use crate::orchestrator::SolveOrchestrator;
use crate::problem::{PerimeterSynthesizer, ProblemSynthesizer, SynthesisParams};
use crate::render::ImageRenderer;
use crate::solver::{GridRouterFactory, SolverConfig};

pub use routes::router;
pub use schemas::{parse_request, GenerateRequest, GenerateResponse};

/// Response reason when the solve task itself dies.
const SOLVE_TASK_FAILED: &str = "solver threw";

#[derive(Clone)]
pub struct GenerateService {
    cache: Arc<dyn CacheStore>,
    synthesizer: Arc<dyn ProblemSynthesizer>,
    orchestrator: Arc<SolveOrchestrator>,
}

impl GenerateService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        synthesizer: Arc<dyn ProblemSynthesizer>,
        orchestrator: Arc<SolveOrchestrator>,
    ) -> Self {
        Self {
            cache,
            synthesizer,
            orchestrator,
        }
    }

    /// Perimeter synthesis, grid routing and default rendering.
    pub fn with_defaults(cache: Arc<dyn CacheStore>) -> Self {
        let orchestrator =
            SolveOrchestrator::new(Arc::new(GridRouterFactory), ImageRenderer::default());
        Self::new(
            cache,
            Arc::new(PerimeterSynthesizer::default()),
            Arc::new(orchestrator),
        )
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Answer one request from the cache, or solve and cache it.
    ///
    /// Cache store errors are logged and treated as misses; the request is
    /// still answered.
    pub async fn generate(&self, request: GenerateRequest) -> GenerateResponse {
        let key = match CacheKey::for_request(&request) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(problem_id = %request.problem_id, error = %e, "Failed to encode cache key");
                None
            }
        };

        if let Some(key) = &key {
            if let Some(mut cached) = self.lookup(key).await {
                metrics::record_cache_lookup(true);
                cached.cached = true;
                info!(
                    problem_id = %request.problem_id,
                    ok = cached.ok,
                    attempts = cached.attempts,
                    cached = true,
                    "Generate request served"
                );
                return cached;
            }
            metrics::record_cache_lookup(false);
        }

        let started = Instant::now();
        let service = self.clone();
        let problem_id = request.problem_id.clone();
        let response = match tokio::task::spawn_blocking(move || service.solve_uncached(&request))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(problem_id = %problem_id, error = %e, "Solve task failed");
                GenerateResponse::failure(SOLVE_TASK_FAILED, 1)
            }
        };
        metrics::observe_solve_duration(started.elapsed().as_secs_f64());

        if let Some(key) = &key {
            self.store(key, &response).await;
        }

        info!(
            problem_id = %problem_id,
            ok = response.ok,
            attempts = response.attempts,
            cached = false,
            "Generate request served"
        );
        response
    }

    async fn lookup(&self, key: &CacheKey) -> Option<GenerateResponse> {
        let payload = match self.cache.get(key).await {
            Ok(payload) => payload?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed");
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, response: &GenerateResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize response for cache");
                return;
            }
        };
        if let Err(e) = self.cache.put(key, &payload).await {
            warn!(key = %key, error = %e, "Cache store failed");
        }
    }

    /// Synthesize and solve, retrying with `seed + k` on attempt `k`.
    pub fn solve_uncached(&self, request: &GenerateRequest) -> GenerateResponse {
        let config = SolverConfig {
            cell_size_mm: request.cell_size_mm,
            trace_thickness_mm: request.trace_thickness_mm,
            trace_margin_mm: request.trace_margin_mm,
            via_diameter_mm: request.via_diameter_mm,
            ..Default::default()
        };
        let attempts = request.max_solve_attempts.max(1);
        let mut last_reason = String::from("no solution");

        for k in 0..attempts {
            let seed = request.seed.saturating_add(i64::from(k));
            let mut params =
                SynthesisParams::new(&request.problem_id, seed, request.pair_count as usize);
            params.min_point_separation_mm = request.min_point_separation_mm;

            let result = self
                .synthesizer
                .synthesize(&params)
                .map_err(SolveError::from)
                .and_then(|problem| self.orchestrator.solve(&problem, &config));

            match result {
                Ok(sample) => return GenerateResponse::success(sample, k + 1, seed),
                Err(e) => {
                    debug!(
                        problem_id = %request.problem_id,
                        attempt = k + 1,
                        seed = seed,
                        reason = %e,
                        "Solve attempt failed"
                    );
                    last_reason = e.to_string();
                }
            }
        }

        warn!(
            problem_id = %request.problem_id,
            attempts = attempts,
            reason = %last_reason,
            "All solve attempts failed"
        );
        GenerateResponse::failure(last_reason, attempts)
    }
}

/// Bind `addr` and serve the sample service until the process exits.
pub async fn serve(addr: &str, service: GenerateService) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        cache = service.cache_backend(),
        "Sample service listening"
    );
    axum::serve(listener, router(Arc::new(service))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::error::SynthesisError;
    use crate::problem::GeneratedProblem;

    struct FailingSynthesizer;

    impl ProblemSynthesizer for FailingSynthesizer {
        fn synthesize(&self, params: &SynthesisParams) -> Result<GeneratedProblem, SynthesisError> {
            Err(SynthesisError::InvalidParameter(format!("seed {}", params.seed)))
        }
    }

    fn failing_service(cache: Arc<dyn CacheStore>) -> GenerateService {
        let orchestrator =
            SolveOrchestrator::new(Arc::new(GridRouterFactory), ImageRenderer::default());
        GenerateService::new(cache, Arc::new(FailingSynthesizer), Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn test_success_is_cached_and_replayed() {
        let cache = Arc::new(MemoryCacheStore::new());
        let service = GenerateService::with_defaults(cache.clone());
        let mut request = GenerateRequest::new("sample-000001", 1);
        request.pair_count = 2;
        request.max_solve_attempts = 3;

        let first = service.generate(request.clone()).await;
        assert!(first.ok, "{:?}", first.reason);
        assert!(!first.cached);
        assert!(first.attempts >= 1);
        assert_eq!(first.used_seed, Some(1 + i64::from(first.attempts - 1)));

        let second = service.generate(request).await;
        assert!(second.cached);
        assert_eq!(second.sample, first.sample);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_cached_with_last_reason() {
        let cache = Arc::new(MemoryCacheStore::new());
        let service = failing_service(cache.clone());
        let mut request = GenerateRequest::new("p", 10);
        request.max_solve_attempts = 3;

        let first = service.generate(request.clone()).await;
        assert!(!first.ok);
        assert_eq!(first.attempts, 3);
        assert_eq!(
            first.reason.as_deref(),
            Some("problem synthesis failed: Invalid synthesis parameter: seed 12")
        );
        assert!(first.used_seed.is_none());

        let second = service.generate(request).await;
        assert!(second.cached);
        assert!(!second.ok);
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_recomputed() {
        let cache = Arc::new(MemoryCacheStore::new());
        let request = GenerateRequest::new("p", 1);
        let key = CacheKey::for_request(&request).unwrap();
        cache.put(&key, "not json").await.unwrap();

        let response = failing_service(cache.clone()).generate(request).await;
        assert!(!response.cached);
        let stored = cache.get(&key).await.unwrap().unwrap();
        assert!(stored.contains("\"ok\":false"));
    }
}

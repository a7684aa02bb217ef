//! Per-request proxy pipeline.
//!
//! Stages run in a fixed order, each able to short-circuit with an error:
//! key resolution, rate limiting, target lookup, quota enforcement,
//! forwarding, usage recording. Attempts that reach the forwarder are
//! recorded exactly once, whether the upstream replied or the connection
//! failed; rejections before the forwarder are not usage.

pub mod auth;
pub mod forward;
pub mod quota;
pub mod rate_limit;
pub mod usage;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use chrono::Utc;

use crate::config::schema::GatewayConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::store::{
    CounterStore, KeyStore, SubscriptionStore, TargetApi, TargetStore, UsageRecord, UsageStore,
};

pub use auth::KeyResolver;
pub use forward::{UpstreamForwarder, UpstreamResponse};
pub use quota::QuotaEnforcer;
pub use rate_limit::{Admission, RateLimitStatus, RateLimiter};
pub use usage::UsageRecorder;

/// One inbound request, decomposed for the pipeline.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub target_id: String,
    /// Remaining path after `/proxy/{target}`, without a leading slash.
    pub path: String,
    pub query: Option<String>,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Best-effort client country from the edge.
    pub country: String,
}

/// The pipeline's answer: an upstream exchange or a gateway error, plus the
/// rate-limit state the response composer puts on the wire.
pub struct ProxyOutcome {
    pub result: Result<UpstreamResponse, GatewayError>,
    pub rate_limit: RateLimitStatus,
}

/// Orchestrates the proxy pipeline. All store handles are injected here,
/// once, at startup.
pub struct Gateway {
    resolver: KeyResolver,
    limiter: RateLimiter,
    quota: QuotaEnforcer,
    forwarder: UpstreamForwarder,
    recorder: UsageRecorder,
    targets: Arc<dyn TargetStore>,
    default_ceiling: u32,
    window_secs: u64,
}

impl Gateway {
    pub fn new(
        keys: Arc<dyn KeyStore>,
        targets: Arc<dyn TargetStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        usage: Arc<dyn UsageStore>,
        counters: Arc<dyn CounterStore>,
        config: &GatewayConfig,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            resolver: KeyResolver::new(keys),
            limiter: RateLimiter::new(counters, config.rate_limit.window_secs),
            quota: QuotaEnforcer::new(subscriptions, usage.clone()),
            forwarder: UpstreamForwarder::new(config.upstream.timeout())?,
            recorder: UsageRecorder::new(usage),
            targets,
            default_ceiling: config.rate_limit.default_ceiling,
            window_secs: config.rate_limit.window_secs,
        })
    }

    /// Rate-limit state for responses produced before the limiter ran.
    pub fn untouched_rate_limit(&self) -> RateLimitStatus {
        RateLimitStatus::untouched(self.default_ceiling, self.window_secs)
    }

    /// Run the full pipeline for one inbound request.
    pub async fn handle(
        self: Arc<Self>,
        credential: Option<String>,
        request: ProxyRequest,
    ) -> ProxyOutcome {
        // Stage 1: key resolution.
        let Some(credential) = credential else {
            return ProxyOutcome {
                result: Err(GatewayError::Unauthorized),
                rate_limit: self.untouched_rate_limit(),
            };
        };
        let key = match self.resolver.resolve(&credential).await {
            Ok(key) => key,
            Err(e) => {
                return ProxyOutcome {
                    result: Err(e),
                    rate_limit: self.untouched_rate_limit(),
                }
            }
        };

        // Stage 2: rate limiting. Atomic, fail-closed.
        let admission = match self.limiter.check(&key).await {
            Ok(admission) => admission,
            Err(e) => {
                return ProxyOutcome {
                    result: Err(e),
                    rate_limit: RateLimitStatus::untouched(key.rate_limit, self.window_secs),
                }
            }
        };
        if !admission.admitted {
            metrics::record_rate_limited(&key.id);
            tracing::warn!(key = %key.id, limit = key.rate_limit, "rate limit exceeded");
            return ProxyOutcome {
                result: Err(GatewayError::RateLimited),
                rate_limit: admission.status,
            };
        }
        let rate_limit = admission.status;

        // Stage 3: target lookup. Inactive targets never receive traffic.
        let target = match self.targets.find(&request.target_id).await {
            Ok(Some(target)) if target.active => target,
            Ok(_) => {
                return ProxyOutcome {
                    result: Err(GatewayError::TargetNotFound(request.target_id.clone())),
                    rate_limit,
                }
            }
            Err(e) => {
                return ProxyOutcome {
                    result: Err(GatewayError::Internal(format!("target lookup failed: {e}"))),
                    rate_limit,
                }
            }
        };

        // Stage 4: quota.
        if let Err(e) = self.quota.check(&key.principal, &target.id).await {
            return ProxyOutcome { result: Err(e), rate_limit };
        }

        // Stages 5-6: forward and record, on a dedicated task. A caller
        // disconnect must not cancel the outbound call or the usage write;
        // billing correctness outranks freeing resources early.
        let gateway = Arc::clone(&self);
        let key_id = key.id.clone();
        let principal = key.principal.clone();
        let task = tokio::spawn(async move {
            gateway
                .forward_and_record(&key_id, &principal, target, request)
                .await
        });
        match task.await {
            Ok(result) => ProxyOutcome { result, rate_limit },
            Err(e) => ProxyOutcome {
                result: Err(GatewayError::Internal(format!("forward task failed: {e}"))),
                rate_limit,
            },
        }
    }

    /// Forward to the upstream and append exactly one usage record, on both
    /// the success and failure paths.
    async fn forward_and_record(
        &self,
        key_id: &str,
        principal: &str,
        target: TargetApi,
        request: ProxyRequest,
    ) -> Result<UpstreamResponse, GatewayError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        let result = self
            .forwarder
            .forward(
                &target,
                request.method.clone(),
                &request.path,
                request.query.as_deref(),
                &request.headers,
                request.body,
            )
            .await;
        let latency = started.elapsed();

        // Synthetic 5xx-class status on connection-level failure, so the
        // attempt is billed and visible in analytics either way.
        let (status_code, error) = match &result {
            Ok(response) => (response.status, None),
            Err(e @ GatewayError::UpstreamUnavailable { .. }) => {
                metrics::record_upstream_error(&target.id);
                (e.status_code().as_u16(), Some(e.details().join("; ")))
            }
            Err(e) => (502, Some(e.to_string())),
        };

        self.recorder
            .record(UsageRecord {
                id: uuid::Uuid::new_v4(),
                target: target.id.clone(),
                principal: principal.to_string(),
                key: key_id.to_string(),
                method: request.method.to_string(),
                path: format!("/{}", request.path.trim_start_matches('/')),
                status_code,
                response_time_ms: latency.as_millis() as u64,
                timestamp,
                country: request.country.clone(),
                error,
            })
            .await;

        metrics::record_request(request.method.as_str(), status_code, &target.id, started);
        result
    }
}

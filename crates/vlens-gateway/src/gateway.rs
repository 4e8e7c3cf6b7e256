//! The inference gateway.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gemini::GeminiTransport;
use crate::limiter::AdmissionControl;
use crate::metrics;
use crate::refusal::RefusalDetector;
use crate::request::{Declined, InferenceOutcome, InferenceReply, InferenceRequest};
use crate::transport::InferenceTransport;

struct Inner {
    config: GatewayConfig,
    transport: Arc<dyn InferenceTransport>,
    admission: AdmissionControl,
    detector: RefusalDetector,
}

/// Single choke-point for calls to the remote multimodal service.
///
/// Clones share admission state, so one gateway per process keeps the
/// serialized lane single-flight across every stage.
#[derive(Clone)]
pub struct InferenceGateway {
    inner: Arc<Inner>,
}

impl InferenceGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn InferenceTransport>) -> Self {
        Self::with_detector(config, transport, RefusalDetector::default())
    }

    pub fn with_detector(
        config: GatewayConfig,
        transport: Arc<dyn InferenceTransport>,
        detector: RefusalDetector,
    ) -> Self {
        let admission = AdmissionControl::new(config.min_spacing, config.parallel_slots);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                admission,
                detector,
            }),
        }
    }

    /// Gateway over the Gemini HTTP transport.
    pub fn gemini(config: GatewayConfig) -> GatewayResult<Self> {
        let transport = GeminiTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Detector used to classify replies; callers reuse it for sub-chunks.
    pub fn refusal_detector(&self) -> &RefusalDetector {
        &self.inner.detector
    }

    /// Run one logical call.
    ///
    /// Retryable transport errors and refusals are retried with the same
    /// backoff schedule. A refusal on the final attempt yields
    /// [`InferenceOutcome::Declined`]; a transport error on the final attempt,
    /// or any non-retryable error, yields [`GatewayError::Transport`].
    pub async fn invoke(&self, request: InferenceRequest) -> GatewayResult<InferenceOutcome> {
        let inner = &self.inner;
        let policy = &inner.config.retry;
        let model = inner.config.models.for_tier(request.tier).to_string();
        let max_attempts = policy.max_attempts();
        let mut last_refusal = String::new();

        for attempt in 0..max_attempts {
            let attempts = attempt + 1;

            let result = {
                let _permit = inner.admission.admit(request.lane).await?;
                let started = Instant::now();
                let result = inner.transport.send(&model, &request).await;
                metrics::record_attempt_latency(request.tier, started.elapsed().as_secs_f64() * 1000.0);
                result
            };

            let retry_after = match result {
                Ok(reply) => {
                    let refusal = match reply.block_reason {
                        Some(reason) => Some(format!("blocked by service: {}", reason)),
                        None => inner.detector.detect(&reply.text, request.refusal_scope),
                    };

                    match refusal {
                        None => {
                            debug!(label = %request.label, model = %model, attempts, "Inference call completed");
                            metrics::record_request(request.tier, "completed");
                            return Ok(InferenceOutcome::Completed(InferenceReply {
                                text: reply.text,
                                model,
                                attempts,
                            }));
                        }
                        Some(reason) => {
                            warn!(
                                label = %request.label,
                                attempt = attempts,
                                max_attempts,
                                reason = %reason,
                                "Model declined request"
                            );
                            metrics::record_refusal(request.tier);
                            if attempts < max_attempts {
                                metrics::record_retry(request.tier, "refusal");
                            }
                            last_refusal = reason;
                            None
                        }
                    }
                }
                Err(err) => {
                    if !err.is_retryable() || attempts == max_attempts {
                        warn!(
                            label = %request.label,
                            attempts,
                            error = %err,
                            "Inference call failed"
                        );
                        metrics::record_request(request.tier, "failed");
                        return Err(GatewayError::Transport {
                            label: request.label.clone(),
                            attempts,
                            source: err,
                        });
                    }
                    warn!(
                        label = %request.label,
                        attempt = attempts,
                        max_attempts,
                        error = %err,
                        "Inference attempt failed, will retry"
                    );
                    metrics::record_retry(request.tier, err.kind());
                    err.retry_after()
                }
            };

            if attempts < max_attempts {
                let delay = policy.delay_before_retry(attempt, retry_after);
                debug!(label = %request.label, delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::time::sleep(delay).await;
            }
        }

        metrics::record_request(request.tier, "declined");
        Ok(InferenceOutcome::Declined(Declined {
            reason: last_refusal,
            attempts: max_attempts,
        }))
    }
}

impl std::fmt::Debug for InferenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceGateway")
            .field("models", &self.inner.config.models)
            .field("admission", &self.inner.admission)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::request::{Lane, RefusalScope};
    use crate::transport::TransportReply;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type Scripted = Result<TransportReply, TransportError>;

    /// Transport replaying a fixed script; repeats the last entry once drained.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        last: Mutex<Option<Scripted>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        latency: Duration,
        started: Mutex<Vec<std::time::Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                latency: Duration::ZERO,
                started: Mutex::new(Vec::new()),
            }
        }

        fn always(entry: Scripted) -> Self {
            Self::new(vec![entry])
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Scripted {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *last = Some(entry.clone());
                    entry
                }
                None => last.clone().unwrap_or_else(|| Ok(TransportReply::text("ok"))),
            }
        }
    }

    #[async_trait]
    impl InferenceTransport for ScriptedTransport {
        async fn send(&self, _model: &str, _request: &InferenceRequest) -> Result<TransportReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.lock().unwrap().push(std::time::Instant::now());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.next()
        }
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> InferenceGateway {
        InferenceGateway::new(GatewayConfig::for_testing(), transport)
    }

    fn server_error() -> Scripted {
        Err(TransportError::Server {
            status: 503,
            message: "unavailable".into(),
        })
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let transport = Arc::new(ScriptedTransport::always(Ok(TransportReply::text("a dog on a beach"))));
        let outcome = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap();

        assert_eq!(outcome.text(), Some("a dog on a beach"));
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            server_error(),
            Err(TransportError::Network("reset".into())),
            Ok(TransportReply::text("done")),
        ]));
        let outcome = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap();

        assert_eq!(outcome.text(), Some("done"));
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_after_budget() {
        let transport = Arc::new(ScriptedTransport::always(server_error()));
        let err = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 3);
        assert_eq!(transport.calls(), 3);
        assert!(matches!(
            err,
            GatewayError::Transport {
                source: TransportError::Server { status: 503, .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let transport = Arc::new(ScriptedTransport::always(Err(TransportError::Client {
            status: 400,
            message: "bad".into(),
        })));
        let err = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_refusal_declined_after_budget() {
        let transport = Arc::new(ScriptedTransport::always(Ok(TransportReply::text(
            "I'm sorry, but I can't provide an analysis of these images.",
        ))));
        let outcome = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap();

        match outcome {
            InferenceOutcome::Declined(declined) => {
                assert_eq!(declined.attempts, 3);
                assert!(!declined.reason.is_empty());
            }
            other => panic!("expected declined, got {:?}", other),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_refusal_recovers_on_retry() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(TransportReply::text("Unable to analyze this content.")),
            Ok(TransportReply::text("SETTING: office")),
        ]));
        let outcome = gateway(transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap();

        assert_eq!(outcome.text(), Some("SETTING: office"));
        assert_eq!(outcome.attempts(), 2);
    }

    #[tokio::test]
    async fn test_safety_block_is_refusal() {
        let transport = Arc::new(ScriptedTransport::always(Ok(TransportReply::blocked("SAFETY"))));
        let outcome = gateway(transport)
            .invoke(InferenceRequest::new("t").with_refusal_scope(RefusalScope::Disabled))
            .await
            .unwrap();

        assert!(outcome.is_declined());
    }

    #[tokio::test]
    async fn test_preamble_scope_keeps_partial_refusal() {
        let text = format!(
            "FRAME 1: SETTING: park\n{}\nFRAME 2: I can't describe this frame.",
            "detail ".repeat(40)
        );
        let transport = Arc::new(ScriptedTransport::always(Ok(TransportReply::text(text))));
        let outcome = gateway(transport)
            .invoke(InferenceRequest::new("t").with_refusal_scope(RefusalScope::Preamble(100)))
            .await
            .unwrap();

        assert!(!outcome.is_declined());
    }

    #[tokio::test]
    async fn test_zero_budget_single_attempt() {
        let mut config = GatewayConfig::for_testing();
        config.retry = config.retry.with_retry_budget(0);
        let transport = Arc::new(ScriptedTransport::always(server_error()));
        let err = InferenceGateway::new(config, transport.clone())
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_honoured() {
        let mut config = GatewayConfig::for_testing();
        config.retry.retry_after_margin = Duration::from_millis(500);
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
                message: "quota".into(),
            }),
            Ok(TransportReply::text("ok")),
        ]));

        let start = tokio::time::Instant::now();
        let outcome = InferenceGateway::new(config, transport)
            .invoke(InferenceRequest::new("t"))
            .await
            .unwrap();

        assert_eq!(outcome.attempts(), 2);
        assert!(start.elapsed() >= Duration::from_millis(7500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let mut config = GatewayConfig::for_testing();
        config.retry = config
            .retry
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30));
        let transport = Arc::new(ScriptedTransport::always(server_error()));

        let start = tokio::time::Instant::now();
        let _ = InferenceGateway::new(config, transport)
            .invoke(InferenceRequest::new("t"))
            .await;

        // 1s after the first failure, 2s after the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_serialized_lane_single_flight() {
        let transport = Arc::new(
            ScriptedTransport::always(Ok(TransportReply::text("ok"))).with_latency(Duration::from_millis(20)),
        );
        let gw = gateway(transport.clone());

        let calls = (0..5).map(|i| gw.invoke(InferenceRequest::new(format!("s{}", i))));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_lane_bounded() {
        let mut config = GatewayConfig::for_testing();
        config.parallel_slots = 2;
        let transport = Arc::new(
            ScriptedTransport::always(Ok(TransportReply::text("ok"))).with_latency(Duration::from_millis(20)),
        );
        let gw = InferenceGateway::new(config, transport.clone());

        let calls = (0..6).map(|i| gw.invoke(InferenceRequest::new(format!("p{}", i)).with_lane(Lane::Parallel)));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_serialized_spacing_between_admissions() {
        let mut config = GatewayConfig::for_testing();
        config.min_spacing = Duration::from_millis(50);
        let transport = Arc::new(ScriptedTransport::always(Ok(TransportReply::text("ok"))));
        let gw = InferenceGateway::new(config, transport.clone());

        let calls = (0..3).map(|i| gw.invoke(InferenceRequest::new(format!("s{}", i))));
        futures::future::join_all(calls).await;

        let started = transport.started.lock().unwrap().clone();
        assert_eq!(started.len(), 3);
        for pair in started.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(45));
        }
    }
}

//! Performance middleware: times the handler call.
//!
//! Every call is recorded in a `tracing` span and the
//! `storefront_request_duration_seconds` histogram. Calls slower than the
//! configured threshold are also reported to the diagnostics sink. The
//! outcome is returned unchanged.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// PerformanceLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PerformanceLayer {
    threshold: Duration,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl PerformanceLayer {
    #[must_use]
    pub fn new(threshold: Duration, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            threshold,
            diagnostics,
        }
    }
}

impl<S> Layer<S> for PerformanceLayer {
    type Service = PerformanceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PerformanceService {
            inner,
            threshold: self.threshold,
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

// ---------------------------------------------------------------------------
// PerformanceService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PerformanceService<S> {
    inner: S,
    threshold: Duration,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<S> Service<Operation> for PerformanceService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        if let Err(e) = op.ctx().ensure_active() {
            return Box::pin(async move { Err(e) });
        }

        let request = op.name();
        let call_id = op.ctx().call_id;
        let caller = op.ctx().caller().to_string();
        let threshold = self.threshold;
        let diagnostics = Arc::clone(&self.diagnostics);

        let span = info_span!(
            "request",
            request = request,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let start = Instant::now();
        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(OperationError::Rejected(_)) => "rejected",
                    Err(_) => "error",
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);
                metrics::histogram!(
                    "storefront_request_duration_seconds",
                    "request" => request,
                    "outcome" => outcome
                )
                .record(elapsed.as_secs_f64());

                if elapsed > threshold {
                    diagnostics.warn(&Diagnostic::SlowRequest {
                        request,
                        call_id,
                        caller,
                        elapsed,
                        threshold,
                    });
                }

                tracing::debug!(duration_ms, outcome, "request complete");
                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Outermost stage: turns every failure into an `ErrorResult`.
//!
//! Structured rejections pass through untouched. Cancellation becomes
//! `COMMON_CANCELLED`. Everything else, including panics in later stages or
//! the handler, is reported to the diagnostics sink and replaced by a generic
//! internal error so no internal detail reaches the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use storefront_core::{ErrorCode, ErrorResult};
use tower::{Layer, Service};

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// ExceptionTranslationLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ExceptionTranslationLayer {
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl ExceptionTranslationLayer {
    #[must_use]
    pub fn new(diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self { diagnostics }
    }
}

impl<S> Layer<S> for ExceptionTranslationLayer {
    type Service = ExceptionTranslationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionTranslationService {
            inner,
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

// ---------------------------------------------------------------------------
// ExceptionTranslationService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ExceptionTranslationService<S> {
    inner: S,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<S> Service<Operation> for ExceptionTranslationService<S>
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
        let request = op.name();
        let call_id = op.ctx().call_id;
        let caller = op.ctx().caller().to_string();
        let diagnostics = Arc::clone(&self.diagnostics);

        // Stages may do synchronous work before returning their future.
        let inner = &mut self.inner;
        let fut = std::panic::catch_unwind(AssertUnwindSafe(move || inner.call(op)));

        Box::pin(async move {
            let outcome = match fut {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            };

            let detail = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(OperationError::Rejected(error))) => {
                    return Err(OperationError::Rejected(error));
                }
                Ok(Err(OperationError::Cancelled)) => {
                    tracing::debug!(request, call_id, "call cancelled");
                    return Err(ErrorResult::from_code(ErrorCode::Cancelled).into());
                }
                Ok(Err(OperationError::Internal(error))) => format!("{error:?}"),
                Ok(Err(other)) => other.to_string(),
                Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
            };

            diagnostics.error(&Diagnostic::UnhandledFailure {
                request,
                call_id,
                caller,
                detail,
            });
            Err(ErrorResult::from_code(ErrorCode::InternalError).into())
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

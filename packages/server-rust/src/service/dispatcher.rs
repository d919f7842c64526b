//! Typed entry point into the request pipeline.

use std::sync::Arc;

use storefront_core::{ErrorCode, ErrorResult, IdentityResolver, Request};
use tower::ServiceExt;

use super::catalog::RequestCatalog;
use super::config::PipelineConfig;
use super::middleware::build_pipeline;
use super::operation::{BoxedFuture, CallContext, Operation, OperationError};
use crate::diagnostics::DiagnosticsSink;

type PipelineFn = dyn Fn(Operation) -> BoxedFuture + Send + Sync;

/// Sends requests through the pipeline to their bound handlers.
///
/// Cheap to clone; clones share the catalog and the pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<RequestCatalog>,
    pipeline: Arc<PipelineFn>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        catalog: RequestCatalog,
        config: &PipelineConfig,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let service = build_pipeline(Arc::clone(&catalog), config, diagnostics);
        let pipeline: Arc<PipelineFn> = Arc::new(move |op: Operation| -> BoxedFuture {
            Box::pin(service.clone().oneshot(op))
        });
        tracing::info!(requests = ?catalog.names(), "dispatcher ready");
        Self { catalog, pipeline }
    }

    /// Runs `request` through every stage and its handler.
    ///
    /// # Errors
    ///
    /// Returns the `ErrorResult` produced by whichever stage or handler
    /// rejected the request. Unexpected failures arrive as the generic
    /// internal error.
    pub async fn dispatch<R: Request>(
        &self,
        request: R,
        ctx: CallContext,
    ) -> Result<R::Response, ErrorResult> {
        match (self.pipeline)(Operation::new(request, ctx)).await {
            Ok(response) => response.downcast::<R::Response>().map_err(|_| {
                tracing::error!(request = R::NAME, "handler produced an unexpected response type");
                ErrorResult::from_code(ErrorCode::InternalError)
            }),
            Err(OperationError::Rejected(error)) => Err(error),
            Err(other) => {
                tracing::error!(request = R::NAME, error = %other, "untranslated pipeline failure");
                Err(ErrorResult::from_code(ErrorCode::InternalError))
            }
        }
    }

    /// Resolves the caller from `resolver` and dispatches with a fresh context.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub async fn dispatch_as<R: Request>(
        &self,
        resolver: &dyn IdentityResolver,
        request: R,
    ) -> Result<R::Response, ErrorResult> {
        self.dispatch(request, CallContext::resolve(resolver)).await
    }

    #[must_use]
    pub fn catalog(&self) -> &RequestCatalog {
        &self.catalog
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

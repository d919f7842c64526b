//! Pipeline composition: wraps the handler router in the fixed stage chain.

use std::sync::Arc;

use tower::ServiceBuilder;

use super::authorization::AuthorizationLayer;
use super::exception::ExceptionTranslationLayer;
use super::performance::PerformanceLayer;
use super::sanitization::SanitizationLayer;
use super::validation::ValidationLayer;
use crate::diagnostics::DiagnosticsSink;
use crate::service::catalog::RequestCatalog;
use crate::service::config::PipelineConfig;
use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};
use crate::service::router::HandlerRouter;

/// Builds the request pipeline around a [`HandlerRouter`] for `catalog`.
///
/// Layer order (outermost to innermost):
/// 1. `ExceptionTranslationLayer` -- everything below it fails as an `ErrorResult`
/// 2. `AuthorizationLayer` -- denied callers never reach sanitization
/// 3. `SanitizationLayer` -- trims text before any rule looks at it
/// 4. `ValidationLayer` -- rejects invalid models before the handler runs
/// 5. `PerformanceLayer` -- times the handler alone
pub fn build_pipeline(
    catalog: Arc<RequestCatalog>,
    config: &PipelineConfig,
    diagnostics: Arc<dyn DiagnosticsSink>,
) -> impl tower::Service<
    Operation,
    Response = OperationResponse,
    Error = OperationError,
    Future = BoxedFuture,
> + Clone + Send + Sync + 'static {
    ServiceBuilder::new()
        .layer(ExceptionTranslationLayer::new(Arc::clone(&diagnostics)))
        .layer(AuthorizationLayer::new(Arc::clone(&catalog)))
        .layer(SanitizationLayer)
        .layer(ValidationLayer::new(Arc::clone(&catalog)))
        .layer(PerformanceLayer::new(config.slow_request_threshold, diagnostics))
        .service(HandlerRouter::new(catalog))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use storefront_core::{impl_sanitize, AccessPolicy, ErrorCode, Identity, Request, RuleSet};
    use tower::ServiceExt;

    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::service::catalog::CatalogBuilder;
    use crate::service::operation::CallContext;
    use crate::service::router::Handler;

    struct Rename {
        name: String,
    }
    impl_sanitize!(Rename { name });
    impl Request for Rename {
        type Response = String;
        const NAME: &'static str = "Rename";
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Handler<Rename> for Recorder {
        async fn handle(&self, request: Rename, _ctx: &CallContext) -> Result<String, OperationError> {
            self.0.lock().push(request.name.clone());
            Ok(request.name)
        }
    }

    fn pipeline(
        recorder: &Recorder,
    ) -> impl tower::Service<
        Operation,
        Response = OperationResponse,
        Error = OperationError,
        Future = BoxedFuture,
    > {
        let catalog = CatalogBuilder::new()
            .handle(recorder.clone())
            .authorize::<Rename>(AccessPolicy::Authenticated)
            .validate(
                RuleSet::<Rename>::new().field("Name", |r: &Rename| &r.name, |f| f.not_empty()),
            )
            .build()
            .unwrap();
        let config = PipelineConfig {
            slow_request_threshold: Duration::from_millis(500),
        };
        build_pipeline(Arc::new(catalog), &config, Arc::new(MemorySink::new()))
    }

    fn rejected_codes(result: Result<OperationResponse, OperationError>) -> Vec<String> {
        match result {
            Err(OperationError::Rejected(error)) => error.codes().map(str::to_string).collect(),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authorization_runs_before_validation() {
        let recorder = Recorder::default();
        let op = Operation::new(
            Rename {
                name: "   ".to_string(),
            },
            CallContext::new(Identity::anonymous()),
        );
        let codes = rejected_codes(pipeline(&recorder).oneshot(op).await);
        assert_eq!(codes, vec![ErrorCode::Unauthorized.as_str().to_string()]);
        assert!(recorder.0.lock().is_empty());
    }

    #[tokio::test]
    async fn sanitization_runs_before_validation() {
        let recorder = Recorder::default();
        let op = Operation::new(
            Rename {
                name: "   ".to_string(),
            },
            CallContext::new(Identity::user("u-1", ["Customer"])),
        );
        let codes = rejected_codes(pipeline(&recorder).oneshot(op).await);
        assert_eq!(codes, vec![ErrorCode::InvalidModel.as_str().to_string()]);
        assert!(recorder.0.lock().is_empty());
    }

    #[tokio::test]
    async fn handler_receives_sanitized_request() {
        let recorder = Recorder::default();
        let op = Operation::new(
            Rename {
                name: "  Lamp ".to_string(),
            },
            CallContext::new(Identity::user("u-1", ["Customer"])),
        );
        let response = pipeline(&recorder).oneshot(op).await.unwrap();
        assert_eq!(response.downcast::<String>().unwrap(), "Lamp");
        assert_eq!(*recorder.0.lock(), vec!["Lamp".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_call_is_translated() {
        let recorder = Recorder::default();
        let ctx = CallContext::new(Identity::user("u-1", ["Customer"]));
        ctx.cancellation.cancel();
        let op = Operation::new(
            Rename {
                name: "Lamp".to_string(),
            },
            ctx,
        );
        let codes = rejected_codes(pipeline(&recorder).oneshot(op).await);
        assert_eq!(codes, vec![ErrorCode::Cancelled.as_str().to_string()]);
        assert!(recorder.0.lock().is_empty());
    }
}

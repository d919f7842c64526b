//! Trims every text field of the request in place before validation.

use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};

#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizationLayer;

impl<S> Layer<S> for SanitizationLayer {
    type Service = SanitizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SanitizationService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct SanitizationService<S> {
    inner: S,
}

impl<S> Service<Operation> for SanitizationService<S>
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

    fn call(&mut self, mut op: Operation) -> Self::Future {
        if let Err(e) = op.ctx().ensure_active() {
            return Box::pin(async move { Err(e) });
        }
        op.request_mut().sanitize();
        Box::pin(self.inner.call(op))
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::{impl_sanitize, Identity, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::CallContext;

    #[derive(Debug, Clone, PartialEq)]
    struct Rename {
        name: String,
        nickname: Option<String>,
        tags: Vec<String>,
    }
    impl_sanitize!(Rename { name, nickname, tags });
    impl Request for Rename {
        type Response = Rename;
        const NAME: &'static str = "Rename";
    }

    /// Returns the request it received.
    #[derive(Clone)]
    struct Mirror;

    impl Service<Operation> for Mirror {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = BoxedFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let (request, _ctx) = op.into_parts();
            Box::pin(async move {
                let request = request
                    .into_any()
                    .downcast::<Rename>()
                    .map_err(|_| anyhow::anyhow!("wrong request type"))?;
                Ok(OperationResponse::new(*request))
            })
        }
    }

    async fn sanitize(request: Rename) -> Rename {
        let op = Operation::new(request, CallContext::new(Identity::anonymous()));
        SanitizationLayer
            .layer(Mirror)
            .oneshot(op)
            .await
            .unwrap()
            .downcast::<Rename>()
            .unwrap()
    }

    #[tokio::test]
    async fn trims_every_text_field() {
        let seen = sanitize(Rename {
            name: "  Desk lamp\t".to_string(),
            nickname: Some("   ".to_string()),
            tags: vec![" office ".to_string(), "light".to_string()],
        })
        .await;
        assert_eq!(
            seen,
            Rename {
                name: "Desk lamp".to_string(),
                nickname: None,
                tags: vec!["office".to_string(), "light".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn sanitizing_twice_changes_nothing() {
        let once = sanitize(Rename {
            name: " a ".to_string(),
            nickname: Some(" b".to_string()),
            tags: vec![],
        })
        .await;
        let twice = sanitize(once.clone()).await;
        assert_eq!(once, twice);
    }
}

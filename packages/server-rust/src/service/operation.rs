//! The envelope that flows through the pipeline and the errors it can carry.

use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use storefront_core::{ErrorResult, Identity, IdentityResolver, Request};
use tokio_util::sync::CancellationToken;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Future returned by every stage and by the handler router.
pub type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// Per-call context carried with every operation through the pipeline.
///
/// Lives for exactly one dispatch. Handlers receive it by reference and
/// should pass `cancellation` on to any I/O they perform.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: u64,
    pub identity: Identity,
    pub cancellation: CancellationToken,
}

impl CallContext {
    /// Context with a fresh call id and an uncancelled token.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            call_id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            identity,
            cancellation: CancellationToken::new(),
        }
    }

    /// Resolves the caller from `resolver` once for this call.
    #[must_use]
    pub fn resolve(resolver: &dyn IdentityResolver) -> Self {
        Self::new(resolver.resolve())
    }

    /// Replaces the token with a caller-supplied one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Fails fast if the caller has already given up on this call.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Cancelled` when the token is cancelled.
    pub fn ensure_active(&self) -> Result<(), OperationError> {
        if self.cancellation.is_cancelled() {
            Err(OperationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The caller's user id for diagnostics, `"anonymous"` when absent.
    #[must_use]
    pub fn caller(&self) -> &str {
        self.identity.user_id.as_deref().unwrap_or("anonymous")
    }
}

// ---------------------------------------------------------------------------
// ErasedRequest
// ---------------------------------------------------------------------------

/// Object-safe view of a [`Request`] used inside the pipeline.
pub trait ErasedRequest: Send {
    fn request_type(&self) -> TypeId;

    fn name(&self) -> &'static str;

    fn sanitize(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<R: Request> ErasedRequest for R {
    fn request_type(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn name(&self) -> &'static str {
        R::NAME
    }

    fn sanitize(&mut self) {
        storefront_core::Sanitize::sanitize(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One request in flight, paired with its call context.
pub struct Operation {
    ctx: CallContext,
    request: Box<dyn ErasedRequest>,
}

impl Operation {
    #[must_use]
    pub fn new<R: Request>(request: R, ctx: CallContext) -> Self {
        Self {
            ctx,
            request: Box::new(request),
        }
    }

    #[must_use]
    pub fn ctx(&self) -> &CallContext {
        &self.ctx
    }

    #[must_use]
    pub fn request(&self) -> &dyn ErasedRequest {
        self.request.as_ref()
    }

    pub fn request_mut(&mut self) -> &mut dyn ErasedRequest {
        self.request.as_mut()
    }

    #[must_use]
    pub fn request_type(&self) -> TypeId {
        self.request.request_type()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.request.name()
    }

    #[must_use]
    pub fn into_parts(self) -> (Box<dyn ErasedRequest>, CallContext) {
        (self.request, self.ctx)
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("request", &self.name())
            .field("call_id", &self.ctx.call_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Response and errors
// ---------------------------------------------------------------------------

/// Successful handler output, type-erased until the dispatcher downcasts it.
pub struct OperationResponse(pub Box<dyn Any + Send>);

impl OperationResponse {
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Recovers the concrete response type.
    ///
    /// # Errors
    ///
    /// Returns the response unchanged if it holds a different type.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|boxed| *boxed).map_err(Self)
    }
}

impl std::fmt::Debug for OperationResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OperationResponse(..)")
    }
}

/// Errors flowing back out of the pipeline.
///
/// Only `Rejected` is an expected outcome; the exception stage turns every
/// other variant into a `Rejected` carrying a generic internal error.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Structured failure raised on purpose by a stage or handler.
    #[error(transparent)]
    Rejected(#[from] ErrorResult),
    #[error("call cancelled by caller")]
    Cancelled,
    #[error("no handler bound for request {name}")]
    UnboundRequest { name: &'static str },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

//! Startup-time binding of request types to handlers, policies, and rules.
//!
//! A [`CatalogBuilder`] collects registrations and is consumed by
//! [`CatalogBuilder::build`], which checks the bindings once. The resulting
//! [`RequestCatalog`] is immutable and shared by every stage.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use storefront_core::{AccessPolicy, Request, RuleSet, ValidationFailure};

use super::router::{ErasedHandler, Handler, HandlerAdapter};

// ---------------------------------------------------------------------------
// ConfigurationError
// ---------------------------------------------------------------------------

/// Invalid request bindings detected while building the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("request {request} has more than one handler")]
    DuplicateHandler { request: &'static str },
    #[error("request {request} has more than one access policy")]
    DuplicatePolicy { request: &'static str },
    #[error("request {request} has more than one rule set")]
    DuplicateRules { request: &'static str },
    #[error("request {request} has a policy or rule set but no handler")]
    MissingHandler { request: &'static str },
}

// ---------------------------------------------------------------------------
// Erased rule sets
// ---------------------------------------------------------------------------

/// Object-safe view of a [`RuleSet`] for one request type.
pub(crate) trait ErasedRules: Send + Sync {
    fn validate_any(&self, request: &dyn Any) -> Vec<ValidationFailure>;
}

impl<R: Request> ErasedRules for RuleSet<R> {
    fn validate_any(&self, request: &dyn Any) -> Vec<ValidationFailure> {
        // The catalog is keyed by TypeId, so a mismatch means a wiring bug
        // and there is nothing to validate against.
        request
            .downcast_ref::<R>()
            .map(|request| self.validate(request))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// RequestCatalog
// ---------------------------------------------------------------------------

pub(crate) struct Binding {
    pub(crate) name: &'static str,
    pub(crate) handler: Arc<dyn ErasedHandler>,
    pub(crate) policy: AccessPolicy,
    pub(crate) rules: Option<Box<dyn ErasedRules>>,
}

/// Immutable lookup from request type to its binding.
pub struct RequestCatalog {
    bindings: HashMap<TypeId, Binding>,
}

static ANONYMOUS: AccessPolicy = AccessPolicy::Anonymous;

impl RequestCatalog {
    pub(crate) fn binding(&self, request_type: TypeId) -> Option<&Binding> {
        self.bindings.get(&request_type)
    }

    /// Declared policy, or [`AccessPolicy::Anonymous`] when none was declared.
    #[must_use]
    pub fn policy(&self, request_type: TypeId) -> &AccessPolicy {
        self.bindings
            .get(&request_type)
            .map_or(&ANONYMOUS, |binding| &binding.policy)
    }

    /// Validates `request` against its rule set; empty when it has none.
    #[must_use]
    pub fn validate(&self, request_type: TypeId, request: &dyn Any) -> Vec<ValidationFailure> {
        self.bindings
            .get(&request_type)
            .and_then(|binding| binding.rules.as_deref())
            .map(|rules| rules.validate_any(request))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_bound<R: Request>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<R>())
    }

    /// Names of all bound request types, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.values().map(|b| b.name).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for RequestCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCatalog")
            .field("requests", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Collects registrations; problems are reported by [`CatalogBuilder::build`].
#[derive(Default)]
pub struct CatalogBuilder {
    handlers: HashMap<TypeId, (&'static str, Arc<dyn ErasedHandler>)>,
    policies: HashMap<TypeId, (&'static str, AccessPolicy)>,
    rules: HashMap<TypeId, (&'static str, Box<dyn ErasedRules>)>,
    problems: Vec<ConfigurationError>,
}

impl CatalogBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the one handler for `R`.
    #[must_use]
    pub fn handle<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        let adapter: Arc<dyn ErasedHandler> = Arc::new(HandlerAdapter::<R, H>::new(handler));
        if self
            .handlers
            .insert(TypeId::of::<R>(), (R::NAME, adapter))
            .is_some()
        {
            self.problems
                .push(ConfigurationError::DuplicateHandler { request: R::NAME });
        }
        self
    }

    /// Declares the access policy for `R`.
    #[must_use]
    pub fn authorize<R: Request>(mut self, policy: AccessPolicy) -> Self {
        if self
            .policies
            .insert(TypeId::of::<R>(), (R::NAME, policy))
            .is_some()
        {
            self.problems
                .push(ConfigurationError::DuplicatePolicy { request: R::NAME });
        }
        self
    }

    /// Declares the rule set for `R`.
    #[must_use]
    pub fn validate<R: Request>(mut self, rules: RuleSet<R>) -> Self {
        if self
            .rules
            .insert(TypeId::of::<R>(), (R::NAME, Box::new(rules)))
            .is_some()
        {
            self.problems
                .push(ConfigurationError::DuplicateRules { request: R::NAME });
        }
        self
    }

    /// Checks the bindings and freezes them.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate registration in registration order, or
    /// otherwise the alphabetically first request that has a policy or rule
    /// set but no handler.
    pub fn build(self) -> Result<RequestCatalog, ConfigurationError> {
        let Self {
            handlers,
            mut policies,
            mut rules,
            problems,
        } = self;

        if let Some(problem) = problems.into_iter().next() {
            return Err(problem);
        }

        let mut orphans: Vec<&'static str> = policies
            .iter()
            .map(|(id, (name, _))| (id, *name))
            .chain(rules.iter().map(|(id, (name, _))| (id, *name)))
            .filter(|(id, _)| !handlers.contains_key(*id))
            .map(|(_, name)| name)
            .collect();
        orphans.sort_unstable();
        if let Some(request) = orphans.first().copied() {
            return Err(ConfigurationError::MissingHandler { request });
        }

        let bindings = handlers
            .into_iter()
            .map(|(id, (name, handler))| {
                let binding = Binding {
                    name,
                    handler,
                    policy: policies.remove(&id).map(|(_, p)| p).unwrap_or_default(),
                    rules: rules.remove(&id).map(|(_, r)| r),
                };
                (id, binding)
            })
            .collect();

        tracing::debug!("request catalog built");
        Ok(RequestCatalog { bindings })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

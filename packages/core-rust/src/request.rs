use std::collections::BTreeSet;

use crate::identity::Identity;
use crate::sanitize::Sanitize;

/// A value object naming one intended operation plus its parameters.
///
/// Each request type is bound to exactly one handler at startup. The request
/// is moved into the pipeline and consumed by that handler.
pub trait Request: Sanitize + Send + 'static {
    /// What the handler produces on success.
    type Response: Send + 'static;

    /// Stable name used in logs and diagnostics (e.g. `"AddCartItem"`).
    const NAME: &'static str;
}

/// Access requirement declared for a request type at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Anyone may dispatch the request.
    #[default]
    Anonymous,
    /// The caller must carry a user id.
    Authenticated,
    /// The caller must be authenticated and hold at least one of the roles.
    Roles(BTreeSet<String>),
}

/// Why an identity failed an [`AccessPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    Unauthenticated,
    MissingRole,
}

impl AccessPolicy {
    /// Shorthand for [`AccessPolicy::Roles`].
    pub fn roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::Roles(roles.into_iter().map(Into::into).collect())
    }

    /// Checks `identity` against the policy.
    ///
    /// An empty role set only requires authentication.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied::Unauthenticated` when a user id is required but
    /// missing, and `AccessDenied::MissingRole` when none of the roles match.
    pub fn check(&self, identity: &Identity) -> Result<(), AccessDenied> {
        match self {
            Self::Anonymous => Ok(()),
            Self::Authenticated => {
                if identity.is_authenticated() {
                    Ok(())
                } else {
                    Err(AccessDenied::Unauthenticated)
                }
            }
            Self::Roles(required) => {
                if !identity.is_authenticated() {
                    Err(AccessDenied::Unauthenticated)
                } else if required.is_empty() || identity.has_any_role(required) {
                    Ok(())
                } else {
                    Err(AccessDenied::MissingRole)
                }
            }
        }
    }
}

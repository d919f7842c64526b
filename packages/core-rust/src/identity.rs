use std::collections::BTreeSet;

/// The caller of one dispatched request.
///
/// Resolved once per inbound call from the transport's ambient context and
/// never cached across calls. An identity without a user id is anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Unique identifier of the authenticated user, if any.
    pub user_id: Option<String>,
    /// Roles granted to the caller. Compared case-sensitively.
    pub roles: BTreeSet<String>,
}

impl Identity {
    /// An unauthenticated caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller with the given roles.
    pub fn user<I, R>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            user_id: Some(user_id.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// True if the caller holds at least one of `required`.
    #[must_use]
    pub fn has_any_role(&self, required: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(required)
    }
}

/// Source of the caller identity for the current inbound call.
///
/// Transports implement this over whatever carries the caller (session
/// cookie, bearer claims, ...). The pipeline calls [`IdentityResolver::resolve`]
/// exactly once per dispatch.
pub trait IdentityResolver: Send + Sync {
    fn current_user_id(&self) -> Option<String>;

    fn current_roles(&self) -> BTreeSet<String>;

    /// Snapshots the resolver into an [`Identity`].
    fn resolve(&self) -> Identity {
        Identity {
            user_id: self.current_user_id(),
            roles: self.current_roles(),
        }
    }
}

/// Resolver that always yields the same identity. Used by the demo binary and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Identity);

impl IdentityResolver for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.0.user_id.clone()
    }

    fn current_roles(&self) -> BTreeSet<String> {
        self.0.roles.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|r| (*r).to_string()).collect()
    }

    #[test]
    fn anonymous_has_no_user() {
        let identity = Identity::anonymous();
        assert!(!identity.is_authenticated());
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn any_role_is_enough() {
        let identity = Identity::user("u-1", ["Customer"]);
        assert!(identity.has_any_role(&roles(&["Admin", "Customer"])));
        assert!(!identity.has_any_role(&roles(&["Admin"])));
    }

    #[test]
    fn role_match_is_case_sensitive() {
        let identity = Identity::user("u-1", ["admin"]);
        assert!(!identity.has_any_role(&roles(&["Admin"])));
    }

    #[test]
    fn static_resolver_snapshots_identity() {
        let resolver = StaticIdentity(Identity::user("u-7", ["Admin"]));
        let identity = resolver.resolve();
        assert_eq!(identity.user_id.as_deref(), Some("u-7"));
        assert_eq!(identity.roles, roles(&["Admin"]));
    }
}

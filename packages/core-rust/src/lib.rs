//! Storefront Core — request model, structured errors, pagination, sanitization and validation.

pub mod error;
pub mod identity;
pub mod pagination;
pub mod request;
pub mod sanitize;
pub mod validation;

pub use error::{ErrorCode, ErrorResult, ValidationFailure};
pub use identity::{Identity, IdentityResolver, StaticIdentity};
pub use pagination::{paginate, OrderedQuery, PageRequest, PaginatedList, PaginationError, VecQuery};
pub use request::{AccessDenied, AccessPolicy, Request};
pub use sanitize::Sanitize;
pub use validation::{FieldRules, NonDefault, RuleSet};


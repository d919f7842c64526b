//! Request dispatching framework.
//!
//! A request flows through the following parts:
//!
//! 1. **Dispatcher** (`dispatcher`): typed entry point, wraps the request in an `Operation`
//! 2. **Middleware** (`middleware`): exception translation, authorization, sanitization,
//!    validation and performance layers, in that order
//! 3. **Routing** (`router`): hands the request to the handler bound in the catalog
//! 4. **Catalog** (`catalog`): startup-time bindings of request types to handlers,
//!    policies and rule sets
//! 5. **Domain** (`domain`): storefront requests and handlers

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod router;

// Re-export key types for convenient access.
pub use catalog::{CatalogBuilder, ConfigurationError, RequestCatalog};
pub use config::PipelineConfig;
pub use dispatcher::Dispatcher;
pub use operation::{BoxedFuture, CallContext, Operation, OperationError, OperationResponse};
pub use router::{Handler, HandlerRouter};

//! Storefront server: request dispatcher, pipeline stages, and storage collaborators.

pub mod diagnostics;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod traits;

pub use diagnostics::{Diagnostic, DiagnosticsSink, MemorySink, TracingSink};
pub use service::{
    CallContext, CatalogBuilder, ConfigurationError, Dispatcher, Handler, OperationError,
    PipelineConfig,
};
pub use traits::{CartStore, CatalogStore, InsertOutcome};

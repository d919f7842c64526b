//! Tower middleware layers for the request pipeline.
//!
//! - [`exception`]: Translates unexpected failures into a generic error
//! - [`authorization`]: Enforces the declared access policy
//! - [`sanitization`]: Trims text fields in place
//! - [`validation`]: Runs the declared rule set
//! - [`performance`]: Times the handler and reports slow calls
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod authorization;
pub mod exception;
pub mod performance;
pub mod pipeline;
pub mod sanitization;
pub mod validation;

pub use authorization::AuthorizationLayer;
pub use exception::ExceptionTranslationLayer;
pub use performance::PerformanceLayer;
pub use pipeline::build_pipeline;
pub use sanitization::SanitizationLayer;
pub use validation::ValidationLayer;

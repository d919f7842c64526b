use std::time::Duration;

/// Default latency above which the performance stage reports a request.
pub const DEFAULT_SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(500);

/// Configuration for the request pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Handler latency above which a warning diagnostic is emitted.
    pub slow_request_threshold: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slow_request_threshold: DEFAULT_SLOW_REQUEST_THRESHOLD,
        }
    }
}

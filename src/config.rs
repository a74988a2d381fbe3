//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one federate's directory runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederateConfig {
    /// Maximum time to wait for a correlated coordinator response before the
    /// operation fails with a communication error.
    pub request_timeout: Duration,
    /// Prefix for generated instance names when registering without a
    /// reserved name.
    pub generated_name_prefix: String,
}

impl Default for FederateConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            generated_name_prefix: "OBJ".to_string(),
        }
    }
}

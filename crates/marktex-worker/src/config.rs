use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Render on a worker thread. When false, or if the worker can't be
    /// started, every request goes through the fallback path.
    pub use_worker: bool,
    /// Deferral before a fallback job runs. `0` means the next scheduler tick.
    pub fallback_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            use_worker: true,
            fallback_delay_ms: 0,
        }
    }
}

impl DispatchConfig {
    pub fn fallback_delay(&self) -> Option<Duration> {
        (self.fallback_delay_ms > 0).then(|| Duration::from_millis(self.fallback_delay_ms))
    }
}

//! Actor system configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::ActorSystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSystemConfig {
    /// Number of worker threads draining mailboxes.
    pub worker_threads: usize,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self { worker_threads: num_cpus::get() }
    }
}

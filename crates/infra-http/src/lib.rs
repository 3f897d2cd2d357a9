// Cascade Infrastructure - HTTP Adapters
// Implements: ExecutionBackend, ImageRegistry, JobScheduler

mod client;
mod execution;
mod registry;
mod scheduler;

pub use execution::HttpExecutionBackend;
pub use registry::HttpImageRegistry;
pub use scheduler::HttpJobScheduler;

use cascade_core::config::BackendConfig;
use cascade_core::error::Result;

/// The three HTTP backends built from one configuration
pub struct HttpBackends {
    pub execution: HttpExecutionBackend,
    pub registry: HttpImageRegistry,
    pub scheduler: HttpJobScheduler,
}

impl HttpBackends {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            execution: HttpExecutionBackend::new(&config.orchestrator_url, config.http_timeout)?,
            registry: HttpImageRegistry::new(&config.registry_url, config.http_timeout)?,
            scheduler: HttpJobScheduler::new(&config.scheduler_url, config.http_timeout)?,
        })
    }
}

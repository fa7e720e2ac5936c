// Port Layer - Interfaces for external dependencies

pub mod deployment_store;
pub mod id_provider; // For deterministic testing
pub mod key_store;
pub mod process_launcher;
pub mod process_probe;
pub mod time_provider;

// Re-exports
pub use deployment_store::DeploymentStore;
pub use id_provider::{IdProvider, UuidProvider};
pub use key_store::{KeyPair, KeyStore};
pub use process_launcher::{ExitOutcome, LaunchError, ProcessLauncher, SpawnedProcess};
pub use process_probe::{ProcessMetrics, ProcessProbe};
pub use time_provider::{SystemTimeProvider, TimeProvider};

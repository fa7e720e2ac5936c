// Application Layer - Use Cases and Business Logic

pub mod generate;
pub mod restart;
pub mod supervisor;
pub mod validate;

// Re-exports
pub use generate::{generate_launch_configs, keys_needed, render, GeneratedSet, RenderedFile};
pub use restart::{RestartDecision, RestartPolicy};
pub use supervisor::{
    shutdown_channel, ShutdownSender, ShutdownToken, Supervisor, SupervisorHandle, SupervisorStats,
};
pub use validate::{validate_ecosystem, Issue, Severity, ValidationReport};

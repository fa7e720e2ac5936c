// Fleet Infrastructure - System Adapters
// Implements: ProcessLauncher, ProcessProbe

pub mod process_probe_impl;
pub mod subprocess_launcher;

pub use process_probe_impl::SysinfoProbe;
pub use subprocess_launcher::{SubprocessLauncher, DEFAULT_ENV_ALLOWLIST};

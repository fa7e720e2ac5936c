//! JSON-RPC API Layer
//!
//! Exposes the supervisor's process table and controls over JSON-RPC 2.0.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig, StartedServer};

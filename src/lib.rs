//! policyd: serves a fixed policy document to every TCP client, then
//! closes the connection.

pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod policy;
pub mod resilience;
pub mod server;

pub use config::DaemonConfig;
pub use lifecycle::Shutdown;
pub use policy::PolicyDocument;
pub use server::PolicyServer;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (-f, -p, -l, -d)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError, Overrides};
pub use schema::DaemonConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::PolicyConfig;

//! Configuration loading and management for the compliance engine.
//!
//! Engine policy (escalation cadence and cap, one-time obligation window) is
//! loaded from a YAML file rather than hard-coded, so deployments can tune
//! the escalation cadence without a rebuild.
//!
//! # Example
//!
//! ```no_run
//! use compliance_engine::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/engine.yaml").unwrap();
//! println!("Escalation every {} days", loader.config().escalation.interval_days);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineConfig, EscalationPolicy};

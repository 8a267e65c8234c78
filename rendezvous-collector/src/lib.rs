//! Rendezvous Collector - releases only the active model version's responses
//! to waiting callers.

pub mod collector;
pub mod config;
pub mod error;

pub use collector::{Collector, Outcome};
pub use config::{CollectorConfig, Config};
pub use error::{Error, Result};

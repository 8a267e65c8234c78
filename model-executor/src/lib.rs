//! Model Executor - answers rendezvous requests with a single model version.

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;

pub use backend::{BackendError, HttpModelBackend, ModelBackend};
pub use config::{Config, ExecutorConfig};
pub use error::{Error, Result};
pub use executor::Executor;

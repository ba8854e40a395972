//! Infrastructure layer: storage backends and process configuration.

pub mod config;
pub mod db;
pub mod memory;
pub mod postgres;

mod integration_tests;

pub use config::{AppConfig, ConfigError};
pub use db::{AnyDatabase, AnyTx};
pub use memory::{InMemoryDatabase, InMemoryTx};
pub use postgres::{PgDatabase, PgTx};

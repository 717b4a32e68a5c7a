//! Database connectors and utilities.
//!
//! Only MongoDB is supported; the user directory keeps a single document
//! collection and needs nothing else.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB connector, config and health check
//! - `config` - `core_config::FromEnv` support for [`mongodb::MongoConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "directory");
//! let client = connect_from_config_with_retry(&config, None).await?;
//! let users = client.database(config.database()).collection::<Document>("users");
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};

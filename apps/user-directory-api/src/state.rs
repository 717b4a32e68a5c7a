//! Application state shared by the route modules.

use mongodb::{Client, Database};

/// Cloned into each router (inexpensive Arc clones)
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// MongoDB client (cloneable, shares underlying connection pool)
    pub mongo_client: Client,
    /// MongoDB database instance
    pub db: Database,
}

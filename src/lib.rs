//! taskd — role-gated task tracking API.
//!
//! Managers create and assign tasks and declare dependencies between
//! them; assignees move their own task's status. Nothing enters
//! `completed` until every direct dependency has completed.

pub mod auth;
pub mod config;
pub mod policy;
pub mod rest;
pub mod seed;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::DaemonConfig;
use storage::Storage;

/// Shared application state passed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: DaemonConfig, storage: Storage) -> Self {
        Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            started_at: std::time::Instant::now(),
        }
    }
}

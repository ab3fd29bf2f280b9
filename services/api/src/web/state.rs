//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request owner.

use crate::config::Config;
use std::sync::Arc;
use task_tracker_core::domain::LOCAL_OWNER_ID;
use task_tracker_core::ports::{TaskStore, UserStore};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server-authoritative tasks, scoped by the signed-in user.
    pub tasks: Arc<dyn TaskStore>,
    /// Single-device tasks used when nobody is signed in.
    pub local_tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<Config>,
}

//=========================================================================================
// Owner (Resolved Once Per Request)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Server,
    Local,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Server => "server",
            StorageMode::Local => "local",
        }
    }
}

/// Whose tasks a request operates on, and which backend holds them.
#[derive(Clone)]
pub struct Owner {
    pub id: Uuid,
    pub mode: StorageMode,
    pub store: Arc<dyn TaskStore>,
}

impl Owner {
    pub fn server(user_id: Uuid, store: Arc<dyn TaskStore>) -> Self {
        Self {
            id: user_id,
            mode: StorageMode::Server,
            store,
        }
    }

    pub fn local(store: Arc<dyn TaskStore>) -> Self {
        Self {
            id: LOCAL_OWNER_ID,
            mode: StorageMode::Local,
            store,
        }
    }
}

//! API handlers and shared application state.

pub mod app;
pub mod auth;
pub mod file;
pub mod user;

use crate::auth::SessionManager;
use crate::db::Database;
use crate::file::FileService;
use crate::worker::{JobQueue, WelcomeJob};

/// Application state shared by all handlers.
///
/// Holds store handles and queue producers only; all of them are cheap to
/// clone and safe to use concurrently.
pub struct AppState {
    pub db: Database,
    pub sessions: SessionManager,
    pub files: FileService,
    pub welcome_queue: JobQueue<WelcomeJob>,
}

impl AppState {
    pub fn new(
        db: Database,
        sessions: SessionManager,
        files: FileService,
        welcome_queue: JobQueue<WelcomeJob>,
    ) -> Self {
        Self {
            db,
            sessions,
            files,
            welcome_queue,
        }
    }
}

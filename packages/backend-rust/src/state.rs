use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::Database;
use crate::response::AppError;
use crate::services::tutor::Tutor;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Option<Arc<Database>>,
    tutor: Arc<Tutor>,
}

impl AppState {
    pub fn new(db: Option<Arc<Database>>, tutor: Arc<Tutor>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db,
            tutor,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> Option<Arc<Database>> {
        self.db.clone()
    }

    /// Database handle, or the 503 every data route answers without one.
    pub fn require_db(&self) -> Result<Arc<Database>, AppError> {
        self.db
            .clone()
            .ok_or_else(|| AppError::unavailable("Database not available"))
    }

    pub fn tutor(&self) -> Arc<Tutor> {
        Arc::clone(&self.tutor)
    }
}

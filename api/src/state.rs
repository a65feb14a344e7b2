use std::sync::Arc;

use qr::{CodePattern, PatternError};
use sea_orm::DatabaseConnection;
use services::CheckInService;

/// Shared handles passed to every handler through axum's `State`.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    check_in: Arc<CheckInService>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, check_in: CheckInService) -> Self {
        Self {
            db,
            check_in: Arc::new(check_in),
        }
    }

    /// State with the check-in policy read from configuration.
    pub fn from_config(db: DatabaseConnection) -> Result<Self, PatternError> {
        Ok(Self::new(db, CheckInService::from_config()?))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    pub fn check_in(&self) -> &CheckInService {
        &self.check_in
    }

    /// Format newly issued codes follow. Check-ins are matched against the same pattern.
    pub fn code_pattern(&self) -> &CodePattern {
        self.check_in.pattern()
    }
}

//! Attributing a location-only code to a scheduled class.
//!
//! Class dates and times are stored as the dojo's wall clock, so check-in instants are
//! shifted by the configured UTC offset before they are compared.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use db::models::class::Model as ScheduledClass;
use sea_orm::{DatabaseConnection, DbErr};
use util::config;

#[async_trait]
pub trait ClassResolver: Send + Sync {
    /// The class a check-in at `location` and `at` counts towards, if any.
    async fn resolve(
        &self,
        db: &DatabaseConnection,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ScheduledClass>, DbErr>;

    fn policy(&self) -> &'static str;
}

fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt).unwrap_or_else(|| {
        tracing::warn!(minutes, "UTC offset out of range, using UTC");
        Utc.fix()
    })
}

fn local(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    at.with_timezone(&offset).naive_local()
}

/// Among the day's classes at the location, the one whose start is closest to the
/// check-in. Ties go to the earlier class.
#[derive(Debug, Clone)]
pub struct NearestScheduledClass {
    offset: FixedOffset,
}

impl NearestScheduledClass {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self {
            offset: offset_from_minutes(utc_offset_minutes),
        }
    }
}

#[async_trait]
impl ClassResolver for NearestScheduledClass {
    async fn resolve(
        &self,
        db: &DatabaseConnection,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ScheduledClass>, DbErr> {
        let now = local(at, self.offset);
        let classes = ScheduledClass::scheduled_on(db, location, now.date()).await?;
        Ok(classes.into_iter().min_by_key(|class| {
            (class.class_date.and_time(class.start_time) - now)
                .num_seconds()
                .abs()
        }))
    }

    fn policy(&self) -> &'static str {
        "nearest"
    }
}

/// The earliest class of the day at the location.
#[derive(Debug, Clone)]
pub struct FirstClassOfDay {
    offset: FixedOffset,
}

impl FirstClassOfDay {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self {
            offset: offset_from_minutes(utc_offset_minutes),
        }
    }
}

#[async_trait]
impl ClassResolver for FirstClassOfDay {
    async fn resolve(
        &self,
        db: &DatabaseConnection,
        location: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ScheduledClass>, DbErr> {
        let day = local(at, self.offset).date();
        let classes = ScheduledClass::scheduled_on(db, location, day).await?;
        Ok(classes.into_iter().next())
    }

    fn policy(&self) -> &'static str {
        "same_day"
    }
}

/// Resolver for a `CLASS_RESOLUTION_POLICY` value. Unknown values fall back to `nearest`.
pub fn resolver_for(policy: &str, utc_offset_minutes: i32) -> Arc<dyn ClassResolver> {
    match policy.trim().to_ascii_lowercase().as_str() {
        "same_day" => Arc::new(FirstClassOfDay::new(utc_offset_minutes)),
        "nearest" => Arc::new(NearestScheduledClass::new(utc_offset_minutes)),
        other => {
            tracing::warn!(policy = other, "Unknown class resolution policy, using nearest");
            Arc::new(NearestScheduledClass::new(utc_offset_minutes))
        }
    }
}

pub fn from_config() -> Arc<dyn ClassResolver> {
    resolver_for(
        &config::class_resolution_policy(),
        config::dojo_utc_offset_minutes(),
    )
}

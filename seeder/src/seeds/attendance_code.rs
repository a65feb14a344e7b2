use crate::seed::Seeder;
use crate::seeds::LOCATIONS;
use async_trait::async_trait;
use chrono::Utc;
use db::models::class::Model as ScheduledClass;
use db::models::user::{Model as User, Role};
use qr::CodePattern;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use services::{AttendanceCodeService, CreateAttendanceCode, IssueError, QuickDuration};

pub struct AttendanceCodeSeeder;

fn to_db_err(e: IssueError) -> DbErr {
    match e {
        IssueError::Database(e) => e,
        other => DbErr::Custom(other.to_string()),
    }
}

#[async_trait]
impl Seeder for AttendanceCodeSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let pattern = CodePattern::from_config().map_err(|e| DbErr::Custom(e.to_string()))?;
        let issuer = db::models::user::Entity::find()
            .filter(db::models::user::Column::Role.eq(Role::Instructor))
            .one(db)
            .await?
            .map(|u: User| u.id)
            .ok_or_else(|| DbErr::Custom("no instructor to issue codes".into()))?;
        let now = Utc::now();

        // A permanent door code per location.
        for location in LOCATIONS {
            let params = CreateAttendanceCode {
                issuer_id: issuer,
                location: location.to_string(),
                ..Default::default()
            };
            AttendanceCodeService::issue(db, &pattern, params, now)
                .await
                .map_err(to_db_err)?;
        }

        // A day code bound to today's evening class at the main dojo.
        let evening = ScheduledClass::scheduled_on(db, LOCATIONS[0], now.date_naive())
            .await?
            .into_iter()
            .last();
        if let Some(class) = evening {
            let params = CreateAttendanceCode {
                issuer_id: issuer,
                location: class.location.clone(),
                class_id: Some(class.id),
                duration: Some(QuickDuration::Day),
                ..Default::default()
            };
            AttendanceCodeService::issue(db, &pattern, params, now)
                .await
                .map_err(to_db_err)?;
        }
        Ok(())
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Select};
use serde::Serialize;

/// A scheduled class session in the `classes` table.
///
/// Dates and times are wall-clock values in the dojo's configured UTC offset.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// e.g. "Brazilian Jiu-Jitsu", "Muay Thai".
    pub discipline: String,
    pub location: String,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub instructor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
    #[sea_orm(has_many = "super::attendance_code::Entity")]
    Codes,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl Related<super::attendance_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Codes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Input for [`Model::create`].
#[derive(Debug, Clone)]
pub struct NewClass {
    pub name: String,
    pub discipline: String,
    pub location: String,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub instructor_id: Option<i64>,
}

impl Model {
    pub async fn create(db: &DatabaseConnection, new: NewClass) -> Result<Self, DbErr> {
        ActiveModel {
            id: NotSet,
            name: Set(new.name),
            discipline: Set(new.discipline),
            location: Set(new.location.trim().to_owned()),
            class_date: Set(new.class_date),
            start_time: Set(new.start_time),
            end_time: Set(new.end_time),
            instructor_id: Set(new.instructor_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Classes held on `date` at `location`, earliest first.
    ///
    /// Locations are free text typed by staff, so they are compared trimmed and
    /// case-insensitively.
    pub async fn scheduled_on(
        db: &DatabaseConnection,
        location: &str,
        date: NaiveDate,
    ) -> Result<Vec<Self>, DbErr> {
        let wanted = location.trim();
        let rows = Self::on_date(date).all(db).await?;
        Ok(rows
            .into_iter()
            .filter(|class| class.location.trim().eq_ignore_ascii_case(wanted))
            .collect())
    }

    fn on_date(date: NaiveDate) -> Select<Entity> {
        Entity::find()
            .filter(Column::ClassDate.eq(date))
            .order_by_asc(Column::StartTime)
    }
}

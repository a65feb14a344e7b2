use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, SqlErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One student's attendance at one scheduled class.
///
/// `attended = false` rows are placeholders other collaborators may pre-create for the
/// roster; a check-in upgrades them in place. The database allows at most one
/// `attended = true` row per `(student_id, class_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    /// Code that produced the record; nulled if that code is later deleted.
    pub code_id: Option<i64>,
    pub attended: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_in_method: Option<CheckInMethod>,
    pub created_at: DateTime<Utc>,
}

/// How a record came to be. Audit only, never used for validation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CheckInMethod {
    #[sea_orm(string_value = "manual")]
    Manual,

    #[sea_orm(string_value = "qr")]
    Qr,

    #[sea_orm(string_value = "geofence")]
    Geofence,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::attendance_code::Entity",
        from = "Column::CodeId",
        to = "super::attendance_code::Column::Id"
    )]
    Code,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Code.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A check-in to persist via [`Model::record_presence`].
#[derive(Debug, Clone)]
pub struct NewPresence {
    pub student_id: i64,
    pub class_id: i64,
    pub code_id: Option<i64>,
    pub check_in_time: DateTime<Utc>,
    pub method: CheckInMethod,
}

/// Result of [`Model::record_presence`].
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    /// A new present row was written, or a placeholder was upgraded.
    Recorded(Model),
    /// The student was already present; nothing was written.
    AlreadyPresent(Model),
}

impl Presence {
    pub fn record(&self) -> &Model {
        match self {
            Presence::Recorded(m) | Presence::AlreadyPresent(m) => m,
        }
    }

    pub fn into_record(self) -> Model {
        match self {
            Presence::Recorded(m) | Presence::AlreadyPresent(m) => m,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Presence::Recorded(_))
    }
}

impl Model {
    pub async fn find_present<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        class_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Attended.eq(true))
            .one(db)
            .await
    }

    async fn find_placeholder<C: ConnectionTrait>(
        db: &C,
        student_id: i64,
        class_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Attended.eq(false))
            .order_by_asc(Column::Id)
            .one(db)
            .await
    }

    /// Pre-creates an absent row for a student expected at a class.
    pub async fn create_placeholder(
        db: &DatabaseConnection,
        student_id: i64,
        class_id: i64,
    ) -> Result<Self, DbErr> {
        ActiveModel {
            id: NotSet,
            student_id: Set(student_id),
            class_id: Set(class_id),
            code_id: Set(None),
            attended: Set(false),
            check_in_time: Set(None),
            check_in_method: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
    }

    /// Marks a student present at a class exactly once.
    ///
    /// Runs in a transaction: an existing present row is returned untouched, a placeholder
    /// is upgraded, otherwise a row is inserted. If a concurrent check-in wins the race the
    /// unique index rejects our write and the winner's row is returned instead.
    pub async fn record_presence(
        db: &DatabaseConnection,
        new: NewPresence,
    ) -> Result<Presence, DbErr> {
        let txn = db.begin().await?;

        if let Some(existing) = Self::find_present(&txn, new.student_id, new.class_id).await? {
            txn.commit().await?;
            return Ok(Presence::AlreadyPresent(existing));
        }

        let written = match Self::find_placeholder(&txn, new.student_id, new.class_id).await? {
            Some(placeholder) => {
                let mut am: ActiveModel = placeholder.into();
                am.attended = Set(true);
                am.code_id = Set(new.code_id);
                am.check_in_time = Set(Some(new.check_in_time));
                am.check_in_method = Set(Some(new.method));
                am.update(&txn).await
            }
            None => {
                ActiveModel {
                    id: NotSet,
                    student_id: Set(new.student_id),
                    class_id: Set(new.class_id),
                    code_id: Set(new.code_id),
                    attended: Set(true),
                    check_in_time: Set(Some(new.check_in_time)),
                    check_in_method: Set(Some(new.method)),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await
            }
        };

        match written {
            Ok(record) => {
                txn.commit().await?;
                Ok(Presence::Recorded(record))
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                txn.rollback().await?;
                tracing::debug!(
                    student_id = new.student_id,
                    class_id = new.class_id,
                    "Concurrent check-in already recorded"
                );
                match Self::find_present(db, new.student_id, new.class_id).await? {
                    Some(existing) => Ok(Presence::AlreadyPresent(existing)),
                    None => Err(err),
                }
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    /// A student's present records with their classes, most recent check-in first.
    pub async fn history_for_student(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Vec<(Self, Option<super::class::Model>)>, DbErr> {
        Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::Attended.eq(true))
            .order_by_desc(Column::CheckInTime)
            .order_by_desc(Column::Id)
            .find_also_related(super::class::Entity)
            .all(db)
            .await
    }

    pub async fn count_present(db: &DatabaseConnection, class_id: i64) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;
        Entity::find()
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Attended.eq(true))
            .count(db)
            .await
    }
}

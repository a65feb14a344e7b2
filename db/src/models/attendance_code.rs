use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{Condition, PaginatorTrait, QueryOrder};
use serde::Serialize;

/// An attendance code staff hand out so students can check themselves in.
///
/// `code` is immutable once issued. Expiry is never written back; it is evaluated against
/// the clock every time the code is read (see [`Model::is_currently_valid`]).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub issuer_id: i64,
    /// `None` means the code is scoped to `location` only.
    pub class_id: Option<i64>,
    pub location: String,
    #[sea_orm(unique)]
    pub code: String,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Input for [`Model::create`]. The window must already be resolved by the caller.
#[derive(Debug, Clone)]
pub struct NewAttendanceCode {
    pub issuer_id: i64,
    pub class_id: Option<i64>,
    pub location: String,
    pub code: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Listing options for [`Model::filter`].
#[derive(Debug, Clone)]
pub struct CodeFilter {
    /// Only codes that are active and inside their window right now.
    pub active_only: bool,
    pub class_id: Option<i64>,
    pub issuer_id: Option<i64>,
    /// Substring of the location.
    pub q: Option<String>,
    /// `created_at` | `location` | `valid_until`, prefix `-` for descending.
    pub sort: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

impl Default for CodeFilter {
    fn default() -> Self {
        Self {
            active_only: false,
            class_id: None,
            issuer_id: None,
            q: None,
            sort: None,
            page: 1,
            per_page: 20,
        }
    }
}

impl Model {
    /// Active, and `now` lies inside the (possibly open) validity window. Both bounds are
    /// inclusive; a code without bounds never expires.
    pub fn is_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from.is_none_or(|from| now >= from)
            && self.valid_until.is_none_or(|until| now <= until)
    }

    /// SQL counterpart of [`Model::is_currently_valid`].
    pub fn currently_valid_condition(now: DateTime<Utc>) -> Condition {
        Condition::all()
            .add(Column::IsActive.eq(true))
            .add(
                Condition::any()
                    .add(Column::ValidFrom.is_null())
                    .add(Column::ValidFrom.lte(now)),
            )
            .add(
                Condition::any()
                    .add(Column::ValidUntil.is_null())
                    .add(Column::ValidUntil.gte(now)),
            )
    }

    pub async fn create(db: &DatabaseConnection, new: NewAttendanceCode) -> Result<Self, DbErr> {
        ActiveModel {
            id: NotSet,
            issuer_id: Set(new.issuer_id),
            class_id: Set(new.class_id),
            location: Set(new.location),
            code: Set(new.code),
            is_active: Set(true),
            valid_from: Set(new.valid_from),
            valid_until: Set(new.valid_until),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Exact lookup on the code string. Callers normalise the string first.
    pub async fn find_by_code(db: &DatabaseConnection, code: &str) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Code.eq(code)).one(db).await
    }

    /// Sets `is_active`. Returns `None` if the code does not exist; setting the current
    /// value again is not an error.
    pub async fn set_active(
        db: &DatabaseConnection,
        id: i64,
        active: bool,
    ) -> Result<Option<Self>, DbErr> {
        let Some(existing) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };
        if existing.is_active == active {
            return Ok(Some(existing));
        }
        let mut am: ActiveModel = existing.into();
        am.is_active = Set(active);
        am.update(db).await.map(Some)
    }

    /// Hard delete. Attendance records keep their row; their `code_id` is nulled by the
    /// foreign key.
    pub async fn delete_by_id(db: &DatabaseConnection, id: i64) -> Result<bool, DbErr> {
        let res = Entity::delete_by_id(id).exec(db).await?;
        Ok(res.rows_affected > 0)
    }

    /// One page of codes plus the total number of matches.
    pub async fn filter(
        db: &DatabaseConnection,
        filter: &CodeFilter,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut sel = Entity::find();
        if filter.active_only {
            sel = sel.filter(Self::currently_valid_condition(now));
        }
        if let Some(class_id) = filter.class_id {
            sel = sel.filter(Column::ClassId.eq(class_id));
        }
        if let Some(issuer_id) = filter.issuer_id {
            sel = sel.filter(Column::IssuerId.eq(issuer_id));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(q));
            sel = sel.filter(Expr::col(Column::Location).like(LikeExpr::new(pattern).escape('\\')));
        }

        let sort = filter.sort.as_deref().unwrap_or("-created_at");
        let (field, desc) = match sort.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (sort, false),
        };
        let column = match field {
            "location" => Column::Location,
            "valid_until" => Column::ValidUntil,
            _ => Column::CreatedAt,
        };
        // Id breaks ties between equal timestamps.
        sel = if desc {
            sel.order_by_desc(column).order_by_desc(Column::Id)
        } else {
            sel.order_by_asc(column).order_by_asc(Column::Id)
        };

        let paginator = sel.paginate(db, filter.per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(filter.page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}

/// Escapes LIKE wildcards so `q` matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Model as UserModel, Role};
    use crate::test_utils::setup_test_db;
    use chrono::{Duration, TimeZone};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, 0, 0).unwrap()
    }

    fn code(is_active: bool, from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Model {
        Model {
            id: 1,
            issuer_id: 1,
            class_id: None,
            location: "Main Dojo".into(),
            code: "HAMARR-AB12CD".into(),
            is_active,
            valid_from: from,
            valid_until: until,
            created_at: at(0),
        }
    }

    #[test]
    fn validity_window_is_inclusive_and_open_ended() {
        assert!(code(true, None, None).is_currently_valid(at(12)));
        assert!(code(true, Some(at(12)), Some(at(13))).is_currently_valid(at(12)));
        assert!(code(true, Some(at(12)), Some(at(13))).is_currently_valid(at(13)));
        assert!(!code(true, Some(at(12)), None).is_currently_valid(at(11)));
        assert!(!code(true, None, Some(at(10))).is_currently_valid(at(11)));
        assert!(!code(false, None, None).is_currently_valid(at(11)));
    }

    #[tokio::test]
    async fn active_only_filter_agrees_with_in_memory_check() {
        let db = setup_test_db().await;
        let issuer = UserModel::create(&db, "sensei", "s@dojo.test", Role::Instructor)
            .await
            .unwrap();
        let now = Utc::now();

        let mk = |code: &str, from, until| NewAttendanceCode {
            issuer_id: issuer.id,
            class_id: None,
            location: "Main Dojo".into(),
            code: code.into(),
            valid_from: from,
            valid_until: until,
        };
        let permanent = Model::create(&db, mk("HAMARR-PERM01", None, None)).await.unwrap();
        let current = Model::create(
            &db,
            mk("HAMARR-CURR01", Some(now - Duration::hours(1)), Some(now + Duration::hours(1))),
        )
        .await
        .unwrap();
        Model::create(&db, mk("HAMARR-PAST01", None, Some(now - Duration::minutes(1))))
            .await
            .unwrap();
        Model::create(&db, mk("HAMARR-SOON01", Some(now + Duration::days(1)), None))
            .await
            .unwrap();
        let switched_off = Model::create(&db, mk("HAMARR-OFF001", None, None)).await.unwrap();
        Model::set_active(&db, switched_off.id, false).await.unwrap();

        let filter = CodeFilter {
            active_only: true,
            sort: Some("created_at".into()),
            ..CodeFilter::default()
        };
        let (rows, total) = Model::filter(&db, &filter, now).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(total, 2);
        assert_eq!(ids, vec![permanent.id, current.id]);

        let (all, all_total) = Model::filter(&db, &CodeFilter::default(), now).await.unwrap();
        assert_eq!(all_total, 5);
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn set_active_is_idempotent_and_reports_missing_codes() {
        let db = setup_test_db().await;
        let issuer = UserModel::create(&db, "sensei", "s@dojo.test", Role::Admin)
            .await
            .unwrap();
        let created = Model::create(
            &db,
            NewAttendanceCode {
                issuer_id: issuer.id,
                class_id: None,
                location: "Annex".into(),
                code: "HAMARR-IDEM01".into(),
                valid_from: None,
                valid_until: None,
            },
        )
        .await
        .unwrap();

        let first = Model::set_active(&db, created.id, false).await.unwrap().unwrap();
        let second = Model::set_active(&db, created.id, false).await.unwrap().unwrap();
        assert!(!first.is_active);
        assert!(!second.is_active);
        assert!(Model::set_active(&db, 4_242, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn location_search_treats_wildcards_literally() {
        let db = setup_test_db().await;
        let issuer = UserModel::create(&db, "sensei", "s@dojo.test", Role::Instructor)
            .await
            .unwrap();
        let mk = |code: &str, location: &str| NewAttendanceCode {
            issuer_id: issuer.id,
            class_id: None,
            location: location.into(),
            code: code.into(),
            valid_from: None,
            valid_until: None,
        };
        Model::create(&db, mk("HAMARR-MAIN01", "Main Dojo")).await.unwrap();
        Model::create(&db, mk("HAMARR-ANNX01", "Annex")).await.unwrap();

        let search = |q: &str| CodeFilter {
            q: Some(q.into()),
            ..CodeFilter::default()
        };
        let now = Utc::now();

        let (_, total) = Model::filter(&db, &search("%"), now).await.unwrap();
        assert_eq!(total, 0);
        let (_, total) = Model::filter(&db, &search("M_in"), now).await.unwrap();
        assert_eq!(total, 0);
        let (rows, _) = Model::filter(&db, &search("dojo"), now).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "HAMARR-MAIN01");

        let discounted = Model::create(&db, mk("HAMARR-HALF01", "Mat 50%_B")).await.unwrap();
        let (rows, total) = Model::filter(&db, &search("50%_"), now).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, discounted.id);
    }

    #[test]
    fn like_escaping_covers_backslash_and_wildcards() {
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
        assert_eq!(escape_like("Main Dojo"), "Main Dojo");
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One timed instance of a course meeting for which attendance is collected.
///
/// Invariant: exactly one live (`session_code`, `current_token`) pair is bound
/// to the session at any time; token rotation replaces `current_token` in
/// place. Sessions are never hard-deleted, so records stay reportable.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning teacher (foreign key to `users`).
    pub teacher_id: i64,
    pub course_id: i64,
    pub batch_id: i64,
    pub status: Status,
    /// Short numeric fallback credential for manual entry.
    pub session_code: String,
    /// The signed QR payload currently accepted for this session.
    pub current_token: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session lifecycle state. `Archived` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "session_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "closed")]
    Closed,

    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id"
    )]
    Batch,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Inserts a new session in `Active` state.
    ///
    /// Callers are expected to mint `session_code` and `current_token`
    /// beforehand (see the session service).
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DatabaseConnection,
        teacher_id: i64,
        course_id: i64,
        batch_id: i64,
        session_code: &str,
        current_token: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let session = ActiveModel {
            teacher_id: Set(teacher_id),
            course_id: Set(course_id),
            batch_id: Set(batch_id),
            status: Set(Status::Active),
            session_code: Set(session_code.to_owned()),
            current_token: Set(current_token.to_owned()),
            start_time: Set(start_time),
            end_time: Set(end_time),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        session.insert(db).await
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Looks up an `Active` session by its numeric fallback code.
    ///
    /// Closed and archived sessions are invisible to this lookup.
    pub async fn find_active_by_code(
        db: &DatabaseConnection,
        session_code: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionCode.eq(session_code))
            .filter(Column::Status.eq(Status::Active))
            .one(db)
            .await
    }

    /// Replaces the session's current token.
    pub async fn update_token(
        self,
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<Self, DbErr> {
        let mut active = self.into_active_model();
        active.current_token = Set(token.to_owned());
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Persists a status change. Transition legality is checked by the
    /// session service, not here.
    pub async fn update_status(
        self,
        db: &DatabaseConnection,
        status: Status,
    ) -> Result<Self, DbErr> {
        let mut active = self.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}

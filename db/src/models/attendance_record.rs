use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One verification outcome for one (session, student) pair.
///
/// The composite primary key IS the at-most-once guarantee: the storage
/// engine rejects a second row for the same pair, so a duplicate mark can
/// never be recorded regardless of request interleaving. Rows are
/// append-only; flags are decided entirely at creation time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub status: AttendanceStatus,
    pub marked_by: MarkedBy,
    pub marked_at: DateTime<Utc>,
    /// Device identifier the mark was submitted from.
    pub device_id: String,
    pub ip_address: Option<String>,
    /// JSON array of `AttendanceFlag` codes attached at creation.
    pub flags: Json,
    pub is_synced: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "late")]
    Late,

    #[sea_orm(string_value = "excused")]
    Excused,
}

/// Who performed the mark: the student themselves, the teacher, or the
/// class representative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "marked_by_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MarkedBy {
    #[sea_orm(string_value = "student")]
    Student,

    #[sea_orm(string_value = "teacher")]
    Teacher,

    #[sea_orm(string_value = "cr")]
    Cr,
}

/// Closed set of anomaly markers a verification can attach to a record.
///
/// Advisory only: a flagged mark is still attendance credit; flags exist so
/// a human can adjudicate, never to silently deny a present student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceFlag {
    /// The device is not in the student's trusted set.
    SuspiciousDevice,
    /// Another student already marked this session from the same device.
    MultipleLoginsSameDevice,
}

impl AttendanceFlag {
    /// Wire code, identical to the serde representation.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::SuspiciousDevice => "SUSPICIOUS_DEVICE",
            Self::MultipleLoginsSameDevice => "MULTIPLE_LOGINS_SAME_DEVICE",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_session::Entity",
        from = "Column::SessionId",
        to = "super::class_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the JSON flags column into typed flags.
    ///
    /// Unknown or malformed entries decode to an empty list rather than an
    /// error: a report query must not fail because one historical row is
    /// bad.
    pub fn flag_list(&self) -> Vec<AttendanceFlag> {
        serde_json::from_value(self.flags.clone()).unwrap_or_default()
    }

    pub fn has_flag(&self, flag: AttendanceFlag) -> bool {
        self.flag_list().contains(&flag)
    }

    pub fn is_flagged(&self) -> bool {
        !self.flag_list().is_empty()
    }

    /// Fetches the record for a (session, student) pair, if any.
    pub async fn find_for(
        db: &DatabaseConnection,
        session_id: i64,
        student_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id((session_id, student_id)).one(db).await
    }

    /// All records for one session.
    pub async fn for_session(
        db: &DatabaseConnection,
        session_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .all(db)
            .await
    }

    /// Whether some other student already marked this session from the same
    /// device.
    pub async fn device_used_by_other(
        db: &DatabaseConnection,
        session_id: i64,
        device_id: &str,
        student_id: i64,
    ) -> Result<bool, DbErr> {
        let found = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::DeviceId.eq(device_id))
            .filter(Column::StudentId.ne(student_id))
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    /// Inserts a record unless one already exists for the (session, student)
    /// pair. Returns `None` when the pair was already marked.
    ///
    /// Single statement with `ON CONFLICT DO NOTHING` on the composite key,
    /// so two concurrent marks for the same pair resolve to exactly one row.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_if_absent(
        db: &DatabaseConnection,
        session_id: i64,
        student_id: i64,
        status: AttendanceStatus,
        marked_by: MarkedBy,
        device_id: &str,
        ip_address: Option<String>,
        flags: &[AttendanceFlag],
    ) -> Result<Option<Self>, DbErr> {
        let flags_json =
            serde_json::to_value(flags).map_err(|e| DbErr::Custom(e.to_string()))?;
        let record = ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            status: Set(status),
            marked_by: Set(marked_by),
            marked_at: Set(Utc::now()),
            device_id: Set(device_id.to_owned()),
            ip_address: Set(ip_address),
            flags: Set(flags_json),
            is_synced: Set(true),
        };

        let insert = Entity::insert(record)
            .on_conflict(
                OnConflict::columns([Column::SessionId, Column::StudentId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        match insert {
            Ok(_) => Self::find_for(db, session_id, student_id).await,
            Err(DbErr::RecordNotInserted) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

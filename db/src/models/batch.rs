use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::Serialize;

/// Represents a student cohort in the `batches` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, e.g. "CS 2026 A".
    pub name: String,
    /// Intake year.
    pub year: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::batch_student::Entity")]
    Members,
    #[sea_orm(has_many = "super::class_session::Entity")]
    Sessions,
}

impl Related<super::batch_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        name: &str,
        year: i32,
    ) -> Result<Self, DbErr> {
        let batch = ActiveModel {
            name: Set(name.to_owned()),
            year: Set(year),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        batch.insert(db).await
    }
}

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

/// Membership table linking students to their batch.
///
/// The report aggregator uses this as the denominator for attendance rates.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "batch_students")]
pub struct Model {
    /// Batch ID (foreign key to `batches`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub batch_id: i64,

    /// Student user ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id"
    )]
    Batch,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
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
    /// Adds a student to a batch.
    pub async fn assign_student_to_batch(
        db: &DatabaseConnection,
        student_id: i64,
        batch_id: i64,
    ) -> Result<Self, DbErr> {
        let member = ActiveModel {
            batch_id: Set(batch_id),
            student_id: Set(student_id),
        };
        member.insert(db).await
    }

    /// Number of students enrolled in the batch.
    pub async fn student_count(db: &DatabaseConnection, batch_id: i64) -> Result<i64, DbErr> {
        let c = Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .count(db)
            .await?;
        Ok(c as i64)
    }
}

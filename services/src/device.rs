//! Trust-on-first-use device binding store.
//!
//! A student's trusted set starts empty and gains its first member the
//! first time they ever mark attendance. Later devices are never added
//! automatically; they only earn flags. Removing a binding is an
//! administrative action that does not live here.

use chrono::Utc;
use db::models::device_binding::{self, ActiveModel, Column, Entity};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

/// Device ids the student has previously been trusted on.
pub async fn bindings_for(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<String>, DbErr> {
    let rows = Entity::find()
        .filter(Column::StudentId.eq(student_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|b| b.device_id).collect())
}

pub async fn is_known_device(
    db: &DatabaseConnection,
    student_id: i64,
    device_id: &str,
) -> Result<bool, DbErr> {
    let found = Entity::find_by_id((student_id, device_id.to_owned()))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Registers the device as the student's first trusted device. Does nothing
/// when the student already has any binding.
///
/// The emptiness check and the insert are separate statements; two racing
/// first marks may both pass the check, in which case the ON CONFLICT
/// clause lets exactly one row land and the other call return quietly.
pub async fn register_first_device(
    db: &DatabaseConnection,
    student_id: i64,
    device_id: &str,
) -> Result<(), DbErr> {
    if !bindings_for(db, student_id).await?.is_empty() {
        return Ok(());
    }

    let binding = ActiveModel {
        student_id: Set(student_id),
        device_id: Set(device_id.to_owned()),
        created_at: Set(Utc::now()),
    };
    let insert = device_binding::Entity::insert(binding)
        .on_conflict(
            OnConflict::columns([Column::StudentId, Column::DeviceId])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {
            tracing::debug!(student_id, device_id, "first device bound");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::user::{Model as User, Role};
    use db::test_utils::setup_test_db;

    #[tokio::test]
    async fn first_device_binds_and_later_devices_do_not() {
        let db = setup_test_db().await;
        let student = User::create(&db, "s1", "s1@test.com", Role::Student)
            .await
            .expect("create student");

        assert!(bindings_for(&db, student.id).await.unwrap().is_empty());

        register_first_device(&db, student.id, "dev-abc")
            .await
            .expect("bind first device");
        assert!(is_known_device(&db, student.id, "dev-abc").await.unwrap());

        // Non-empty set: a different device must not be added.
        register_first_device(&db, student.id, "dev-xyz")
            .await
            .expect("no-op");
        assert!(!is_known_device(&db, student.id, "dev-xyz").await.unwrap());
        assert_eq!(bindings_for(&db, student.id).await.unwrap(), vec!["dev-abc"]);
    }

    #[tokio::test]
    async fn rebinding_the_same_device_is_idempotent() {
        let db = setup_test_db().await;
        let student = User::create(&db, "s2", "s2@test.com", Role::Student)
            .await
            .expect("create student");

        register_first_device(&db, student.id, "dev-abc")
            .await
            .expect("bind");
        register_first_device(&db, student.id, "dev-abc")
            .await
            .expect("rebind is a no-op");
        assert_eq!(bindings_for(&db, student.id).await.unwrap().len(), 1);
    }
}

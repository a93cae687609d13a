use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608010001_create_users::Migration),
            Box::new(migrations::m202608010002_create_courses::Migration),
            Box::new(migrations::m202608010003_create_class_sessions::Migration),
            Box::new(migrations::m202608010004_create_attendance::Migration),
        ]
    }
}

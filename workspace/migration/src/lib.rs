pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_table;
mod m20240610_000001_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_table::Migration),
            Box::new(m20240610_000001_add_lookup_indexes::Migration),
        ]
    }
}

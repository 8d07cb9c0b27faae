//! Explicit list of entities whose tables the module manages

use crate::contract::StorageEntity;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

type TableBuilder = fn(&Schema) -> TableCreateStatement;

fn table_statement<E: StorageEntity>(schema: &Schema) -> TableCreateStatement {
    schema.create_table_from_entity(E::default())
}

/// Entities registered for schema creation at bootstrap
#[derive(Default)]
pub struct EntityRegistry {
    tables: Vec<(String, TableBuilder)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E`. Registering the same table twice is a no-op.
    pub fn register<E: StorageEntity>(mut self) -> Self {
        let name = E::default().table_name().to_owned();
        if !self.tables.iter().any(|(existing, _)| *existing == name) {
            self.tables.push((name, table_statement::<E>));
        }
        self
    }

    /// Registered table names, in registration order
    pub fn tables(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Create every registered table that does not exist yet
    pub async fn ensure_schema(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        for (name, build) in &self.tables {
            let mut statement = build(&schema);
            statement.if_not_exists();
            db.execute(backend.build(&statement)).await?;
            tracing::info!(table = %name, "Entity table ensured");
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("tables", &self.tables())
            .finish()
    }
}

//! Idempotent schema installation and removal.

use tracing::info;

use crate::database::schema::{Column, Entity, EntitySchema, KeyKind};
use crate::database::{Database, DatabaseError, Dialect};
use crate::options;

/// Create every entity table and index that does not exist yet, then seed default options
pub async fn install(db: &Database) -> Result<(), DatabaseError> {
    let mut tx = db.pool().begin().await?;
    for entity in Entity::ALL {
        let schema = entity.schema();
        let table = db.table(entity);
        for statement in create_statements(schema, &table, db.dialect()) {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
    }
    tx.commit().await?;
    info!("Installed {} tables with prefix {:?}", Entity::ALL.len(), db.prefix());

    let seeded = options::seed_defaults(db).await?;
    if seeded > 0 {
        info!("Seeded {} default options", seeded);
    }
    Ok(())
}

/// Drop every entity table
pub async fn uninstall(db: &Database) -> Result<(), DatabaseError> {
    let mut tx = db.pool().begin().await?;
    for entity in Entity::ALL.iter().rev() {
        let sql = format!("DROP TABLE IF EXISTS {}", Database::quote_identifier(&db.table(*entity)));
        sqlx::query(&sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!("Dropped {} tables with prefix {:?}", Entity::ALL.len(), db.prefix());
    Ok(())
}

fn create_statements(schema: &EntitySchema, table: &str, dialect: Dialect) -> Vec<String> {
    let columns: Vec<String> = schema.columns.iter().map(|c| column_definition(c, dialect)).collect();
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        Database::quote_identifier(table),
        columns.join(", ")
    )];
    for column in schema.indexes {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            Database::quote_identifier(&format!("{}_{}_idx", table, column)),
            Database::quote_identifier(table),
            Database::quote_identifier(column)
        ));
    }
    statements
}

fn column_definition(column: &Column, dialect: Dialect) -> String {
    let name = Database::quote_identifier(column.name);
    match column.key {
        KeyKind::Generated => format!("{} {}", name, dialect.serial_primary_key()),
        KeyKind::Natural => format!("{} {} PRIMARY KEY", name, column.kind.sql_type()),
        KeyKind::None => {
            let unique = if column.unique { " UNIQUE" } else { "" };
            format!("{} {} NOT NULL DEFAULT {}{}", name, column.kind.sql_type(), column.default, unique)
        }
    }
}

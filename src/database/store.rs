use serde_json::{Map, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Any, AnyConnection};
use sqlx::query::Query;
use sqlx::Row as _;
use thiserror::Error;
use tracing::debug;

use crate::database::schema::{Column, ColumnKind, Entity, EntitySchema};
use crate::database::Database;
use crate::filter::error::FilterError;
use crate::filter::{Filter, FilterOrderInfo, FilterWhereInfo, Pagination, SqlValue};

/// A decoded row keyed by column name
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found")]
    NotFound,

    #[error("Query on {table} failed: {source}")]
    QueryFailed {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Write to {table} failed: {source}")]
    WriteFailed {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid value for {column}: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Missing key field: {0}")]
    MissingKey(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// How listed rows are returned to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowShape {
    #[default]
    List,
    /// Object keyed by each row's primary key
    Keyed,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<FilterWhereInfo>,
    pub order: Option<FilterOrderInfo>,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.filters.push(FilterWhereInfo::eq(column, value));
        self
    }

    pub fn order(mut self, order: Option<FilterOrderInfo>) -> Self {
        self.order = order;
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Row>,
    pub total: i64,
    pub total_pages: i64,
}

impl Page {
    pub fn into_value(self, shape: RowShape, key: &str) -> Value {
        match shape {
            RowShape::List => Value::Array(self.rows.into_iter().map(Value::Object).collect()),
            RowShape::Keyed => {
                let mut keyed = Map::new();
                for row in self.rows {
                    let id = match row.get(key) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => continue,
                    };
                    keyed.insert(id, Value::Object(row));
                }
                Value::Object(keyed)
            }
        }
    }
}

/// Parameterized reads and writes against one physical table
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: &'static EntitySchema,
    table: String,
}

impl RecordStore {
    pub fn new(schema: &'static EntitySchema, table: impl Into<String>) -> Self {
        Self { schema, table: table.into() }
    }

    pub fn for_entity(db: &Database, entity: Entity) -> Self {
        Self::new(entity.schema(), db.table(entity))
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn list(&self, conn: &mut AnyConnection, query: &ListQuery) -> Result<Page, StoreError> {
        for condition in &query.filters {
            self.check_column(&condition.column)?;
        }
        if let Some(order) = &query.order {
            self.check_column(&order.column)?;
        }

        let mut filter = Filter::new(&self.table)?;
        filter
            .select(&self.schema.column_names())?
            .where_clause(query.filters.clone())?
            .order(query.order.clone())
            .paginate(&query.pagination)?;

        let count_sql = filter.to_count_sql()?;
        debug!("{}", count_sql.query);
        let count_row = bind_params(sqlx::query(&count_sql.query), &count_sql.params)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| self.query_failed(e))?;
        let total: i64 = count_row.try_get("count").map_err(|e| self.query_failed(e))?;

        let sql = filter.to_sql()?;
        debug!("{}", sql.query);
        let rows = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| self.query_failed(e))?;
        let rows = rows.iter().map(|r| self.decode(r)).collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            rows,
            total,
            total_pages: query.pagination.total_pages(total),
        })
    }

    /// First row matching every condition, if any
    pub async fn find(
        &self,
        conn: &mut AnyConnection,
        filters: &[FilterWhereInfo],
    ) -> Result<Option<Row>, StoreError> {
        if filters.is_empty() {
            return Err(FilterError::MissingCondition(self.table.clone()).into());
        }
        for condition in filters {
            self.check_column(&condition.column)?;
        }

        let mut filter = Filter::new(&self.table)?;
        filter
            .select(&self.schema.column_names())?
            .where_clause(filters.to_vec())?
            .limit(1, None)?;

        let sql = filter.to_sql()?;
        debug!("{}", sql.query);
        let row = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| self.query_failed(e))?;

        row.map(|r| self.decode(&r)).transpose()
    }

    /// Like `find`, but no match is `NotFound`
    pub async fn get_one(&self, conn: &mut AnyConnection, filters: &[FilterWhereInfo]) -> Result<Row, StoreError> {
        self.find(conn, filters).await?.ok_or(StoreError::NotFound)
    }

    pub async fn count(&self, conn: &mut AnyConnection, filters: &[FilterWhereInfo]) -> Result<i64, StoreError> {
        for condition in filters {
            self.check_column(&condition.column)?;
        }
        let mut filter = Filter::new(&self.table)?;
        filter.where_clause(filters.to_vec())?;
        let sql = filter.to_count_sql()?;
        let row = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| self.query_failed(e))?;
        row.try_get("count").map_err(|e| self.query_failed(e))
    }

    /// Insert a row, filling the entity's insert timestamps, and return its key
    pub async fn insert(&self, conn: &mut AnyConnection, mut data: Row) -> Result<SqlValue, StoreError> {
        for stamp in self.schema.timestamps.on_insert {
            data.insert(stamp.field.to_string(), Value::String(stamp.clock.now()));
        }
        if self.schema.key_is_generated() {
            data.remove(self.schema.key);
        }

        let (columns, params) = self.bindings(&data)?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING \"{}\"", self.table, self.schema.key)
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING \"{}\"",
                self.table,
                quote_all(&columns),
                placeholders.join(", "),
                self.schema.key
            )
        };
        debug!("{}", sql);

        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| self.write_failed(e))?;

        let key_column = self.key_column()?;
        match key_column.kind {
            ColumnKind::Int => row.try_get::<i64, _>(0).map(SqlValue::Int),
            ColumnKind::Text => row.try_get::<String, _>(0).map(SqlValue::Text),
        }
        .map_err(|e| self.write_failed(e))
    }

    /// Insert into a table with a numeric key and return the new id
    pub async fn insert_id(&self, conn: &mut AnyConnection, data: Row) -> Result<i64, StoreError> {
        match self.insert(conn, data).await? {
            SqlValue::Int(id) => Ok(id),
            SqlValue::Text(_) => Err(StoreError::InvalidValue {
                column: self.schema.key.to_string(),
                reason: "key is not numeric".to_string(),
            }),
        }
    }

    /// Update the row whose `key_field` equals `data[key_field]`.
    ///
    /// A change set holding only the key is a no-op that still reports `NotFound` for a missing row.
    pub async fn update(&self, conn: &mut AnyConnection, mut data: Row, key_field: &str) -> Result<(), StoreError> {
        let key_column = *self
            .schema
            .column(key_field)
            .ok_or_else(|| StoreError::UnknownColumn(key_field.to_string()))?;
        let key_value = data
            .remove(key_field)
            .ok_or_else(|| StoreError::MissingKey(key_field.to_string()))?;
        let key_value = to_sql_value(&key_column, &key_value)?;

        if data.is_empty() {
            return self.get_one(conn, &[FilterWhereInfo::eq(key_field, key_value)]).await.map(|_| ());
        }

        for stamp in self.schema.timestamps.on_update {
            data.insert(stamp.field.to_string(), Value::String(stamp.clock.now()));
        }

        let (columns, mut params) = self.bindings(&data)?;
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect();
        params.push(key_value);
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ${}",
            self.table,
            assignments.join(", "),
            key_field,
            params.len()
        );
        debug!("{}", sql);

        let result = bind_params(sqlx::query(&sql), &params)
            .execute(&mut *conn)
            .await
            .map_err(|e| self.write_failed(e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete every row matching all conditions; returns the number removed
    pub async fn delete(&self, conn: &mut AnyConnection, filters: &[FilterWhereInfo]) -> Result<u64, StoreError> {
        for condition in filters {
            self.check_column(&condition.column)?;
        }
        let mut filter = Filter::new(&self.table)?;
        filter.where_clause(filters.to_vec())?;
        let sql = filter.to_delete_sql()?;
        debug!("{}", sql.query);

        let result = bind_params(sqlx::query(&sql.query), &sql.params)
            .execute(&mut *conn)
            .await
            .map_err(|e| self.write_failed(e))?;
        Ok(result.rows_affected())
    }

    fn check_column(&self, name: &str) -> Result<(), StoreError> {
        if self.schema.has_column(name) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn(name.to_string()))
        }
    }

    fn key_column(&self) -> Result<&Column, StoreError> {
        self.schema
            .column(self.schema.key)
            .ok_or_else(|| StoreError::UnknownColumn(self.schema.key.to_string()))
    }

    /// Columns and bound values in schema order
    fn bindings(&self, data: &Row) -> Result<(Vec<&'static str>, Vec<SqlValue>), StoreError> {
        if let Some(unknown) = data.keys().find(|k| !self.schema.has_column(k)) {
            return Err(StoreError::UnknownColumn(unknown.clone()));
        }
        let mut columns = Vec::with_capacity(data.len());
        let mut params = Vec::with_capacity(data.len());
        for column in self.schema.columns {
            if let Some(value) = data.get(column.name) {
                columns.push(column.name);
                params.push(to_sql_value(column, value)?);
            }
        }
        Ok((columns, params))
    }

    fn decode(&self, row: &AnyRow) -> Result<Row, StoreError> {
        let mut out = Map::new();
        for column in self.schema.columns {
            let value = match column.kind {
                ColumnKind::Int => row.try_get::<i64, _>(column.name).map(Value::from),
                ColumnKind::Text => row.try_get::<String, _>(column.name).map(Value::String),
            }
            .map_err(|e| self.query_failed(e))?;
            out.insert(column.name.to_string(), value);
        }
        Ok(out)
    }

    fn query_failed(&self, source: sqlx::Error) -> StoreError {
        StoreError::QueryFailed { table: self.table.clone(), source }
    }

    fn write_failed(&self, source: sqlx::Error) -> StoreError {
        StoreError::WriteFailed { table: self.table.clone(), source }
    }
}

fn quote_all(columns: &[&str]) -> String {
    columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
}

fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

/// Coerce a JSON value into the column's storage type
pub fn to_sql_value(column: &Column, value: &Value) -> Result<SqlValue, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidValue {
        column: column.name.to_string(),
        reason: reason.to_string(),
    };
    match column.kind {
        ColumnKind::Int => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(SqlValue::Int)
                .ok_or_else(|| invalid("number out of range")),
            Value::Bool(b) => Ok(SqlValue::Int(i64::from(*b))),
            Value::String(s) if s.trim().is_empty() => Ok(SqlValue::Int(0)),
            Value::String(s) => s.trim().parse::<i64>().map(SqlValue::Int).map_err(|_| invalid("expected a number")),
            Value::Null => Ok(SqlValue::Int(0)),
            _ => Err(invalid("expected a number")),
        },
        ColumnKind::Text => Ok(SqlValue::Text(match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        })),
    }
}

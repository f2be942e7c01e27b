use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{is_identifier, FilterWhere};
use super::types::{FilterOrderInfo, FilterWhereInfo, Pagination, SqlResult};

/// SELECT / COUNT / DELETE builder over one physical table
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Vec<FilterWhereInfo>,
    order_data: Option<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: vec![],
            order_data: None,
            limit: None,
            offset: None,
        })
    }

    pub fn select<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self, FilterError> {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Self::validate_select_columns(&columns)?;
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Vec<FilterWhereInfo>) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = conditions;
        Ok(self)
    }

    pub fn order(&mut self, order: Option<FilterOrderInfo>) -> &mut Self {
        self.order_data = order;
        self
    }

    pub fn paginate(&mut self, pagination: &Pagination) -> Result<&mut Self, FilterError> {
        if let Some(limit) = pagination.limit() {
            self.limit(limit, Some(pagination.offset()))?;
        }
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if offset.is_some_and(|o| o < 0) {
            return Err(FilterError::InvalidLimit("Offset must be non-negative".to_string()));
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            Self::prefix_where(&where_result.query),
            FilterOrder::generate(self.order_data.as_ref()),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(&self.where_data, 0)?;
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name),
            Self::prefix_where(&where_result.query),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        Ok(SqlResult { query, params: where_result.params })
    }

    /// DELETE requires at least one condition.
    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        if self.where_data.is_empty() {
            return Err(FilterError::MissingCondition(self.table_name.clone()));
        }
        let where_result = self.to_where_sql()?;
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_result.query),
            params: where_result.params,
        })
    }

    fn prefix_where(clause: &str) -> String {
        if clause.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clause)
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }

    fn validate_select_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if column == "*" {
                continue;
            }
            if !is_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{SortDirection, SqlValue};

    #[test]
    fn builds_paginated_ordered_select() {
        let mut filter = Filter::new("wp_wpnakama_phases").unwrap();
        filter
            .select(&["phase_id", "title"])
            .unwrap()
            .where_clause(vec![FilterWhereInfo { column: "board_id".into(), value: SqlValue::Int(2) }])
            .unwrap()
            .order(Some(FilterOrderInfo { column: "position".into(), sort: SortDirection::Asc }))
            .paginate(&Pagination::new(2, 5))
            .unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"phase_id\", \"title\" FROM \"wp_wpnakama_phases\" WHERE \"board_id\" = $1 ORDER BY \"position\" ASC LIMIT 5 OFFSET 5"
        );
        assert_eq!(sql.params, vec![SqlValue::Int(2)]);

        let count = filter.to_count_sql().unwrap();
        assert_eq!(count.query, "SELECT COUNT(*) AS count FROM \"wp_wpnakama_phases\" WHERE \"board_id\" = $1");
    }

    #[test]
    fn unbounded_select_has_no_limit() {
        let mut filter = Filter::new("wp_wpnakama_boards").unwrap();
        filter.paginate(&Pagination::unbounded()).unwrap();
        assert_eq!(filter.to_sql().unwrap().query, "SELECT * FROM \"wp_wpnakama_boards\"");
    }

    #[test]
    fn delete_needs_a_condition() {
        let filter = Filter::new("wp_wpnakama_cards").unwrap();
        assert!(matches!(filter.to_delete_sql(), Err(FilterError::MissingCondition(_))));
    }

    #[test]
    fn rejects_bad_table_name() {
        assert!(Filter::new("cards\"; --").is_err());
    }
}

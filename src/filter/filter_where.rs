use super::error::FilterError;
use super::types::{FilterWhereInfo, SqlValue};

/// Most equality conditions a single query may carry.
pub const MAX_CONDITIONS: usize = 3;

pub struct FilterWhere {
    param_values: Vec<SqlValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// AND-combined equality. Placeholders continue after `starting_param_index`.
    pub fn generate(
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
    ) -> Result<(String, Vec<SqlValue>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(conditions)
    }

    pub fn validate(conditions: &[FilterWhereInfo]) -> Result<(), FilterError> {
        if conditions.len() > MAX_CONDITIONS {
            return Err(FilterError::TooManyConditions(conditions.len()));
        }
        for condition in conditions {
            if !is_identifier(&condition.column) {
                return Err(FilterError::InvalidColumn(condition.column.clone()));
            }
        }
        Ok(())
    }

    fn build(&mut self, conditions: &[FilterWhereInfo]) -> Result<(String, Vec<SqlValue>), FilterError> {
        Self::validate(conditions)?;

        let sql_conditions: Vec<String> = conditions
            .iter()
            .map(|condition| {
                self.param_values.push(condition.value.clone());
                self.param_index += 1;
                format!("\"{}\" = ${}", condition.column, self.param_index)
            })
            .collect();

        Ok((sql_conditions.join(" AND "), std::mem::take(&mut self.param_values)))
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(column: &str, value: i64) -> FilterWhereInfo {
        FilterWhereInfo { column: column.to_string(), value: SqlValue::Int(value) }
    }

    #[test]
    fn joins_conditions_with_and() {
        let (sql, params) = FilterWhere::generate(&[eq("board_id", 2), eq("card_id", 9)], 0).unwrap();
        assert_eq!(sql, "\"board_id\" = $1 AND \"card_id\" = $2");
        assert_eq!(params, vec![SqlValue::Int(2), SqlValue::Int(9)]);
    }

    #[test]
    fn continues_placeholder_numbering() {
        let (sql, _) = FilterWhere::generate(&[eq("task_id", 1)], 3).unwrap();
        assert_eq!(sql, "\"task_id\" = $4");
    }

    #[test]
    fn rejects_fourth_condition() {
        let conditions = vec![eq("a", 1), eq("b", 2), eq("c", 3), eq("d", 4)];
        assert!(matches!(
            FilterWhere::generate(&conditions, 0),
            Err(FilterError::TooManyConditions(4))
        ));
    }

    #[test]
    fn rejects_injected_column() {
        let bad = FilterWhereInfo { column: "id; DROP TABLE x".to_string(), value: SqlValue::Int(1) };
        assert!(matches!(FilterWhere::generate(&[bad], 0), Err(FilterError::InvalidColumn(_))));
    }
}

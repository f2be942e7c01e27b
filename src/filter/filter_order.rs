use super::error::FilterError;
use super::filter_where::is_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse an `order_by` column and an `asc`/`desc` direction
    pub fn validate_and_parse(order_by: &str, order: &str) -> Result<FilterOrderInfo, FilterError> {
        let column = order_by.trim();
        if !is_identifier(column) {
            return Err(FilterError::InvalidColumn(column.to_string()));
        }
        let sort = SortDirection::parse(order).ok_or_else(|| FilterError::InvalidOrder(order.to_string()))?;
        Ok(FilterOrderInfo { column: column.to_string(), sort })
    }

    pub fn generate(info: Option<&FilterOrderInfo>) -> String {
        match info {
            Some(i) => format!("ORDER BY \"{}\" {}", i.column, i.sort.to_sql()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_column_and_direction() {
        let info = FilterOrder::validate_and_parse("position", "desc").unwrap();
        assert_eq!(info.column, "position");
        assert_eq!(info.sort, SortDirection::Desc);
        assert_eq!(FilterOrder::generate(Some(&info)), "ORDER BY \"position\" DESC");
    }

    #[test]
    fn rejects_unknown_direction() {
        assert!(matches!(
            FilterOrder::validate_and_parse("position", "random()"),
            Err(FilterError::InvalidOrder(_))
        ));
    }

    #[test]
    fn no_order_generates_nothing() {
        assert_eq!(FilterOrder::generate(None), "");
    }
}

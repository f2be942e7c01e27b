use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bound SQL parameter. Every stored column is either a 64-bit integer or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl SqlValue {
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Int(v) => Value::from(*v),
            SqlValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One `"column" = $n` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub value: SqlValue,
}

impl FilterWhereInfo {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Page-number pagination. `per_page: None` returns every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Rows skipped before this page; `None` when the page lies beyond `i64` range
    pub fn checked_offset(&self) -> Option<i64> {
        match (self.per_page, self.page) {
            (Some(per_page), Some(page)) if per_page > 0 && page > 0 => per_page.checked_mul(page - 1),
            _ => Some(0),
        }
    }

    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> Option<i64> {
        self.per_page.filter(|p| *p > 0)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        match self.limit() {
            Some(per_page) => total / per_page + i64::from(total % per_page != 0),
            None => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page_number() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(2, 5).offset(), 5);
        assert_eq!(Pagination::new(3, 5).offset(), 10);
        assert_eq!(Pagination { page: None, per_page: Some(5) }.offset(), 0);
        assert_eq!(Pagination { page: Some(4), per_page: None }.offset(), 0);
        assert_eq!(Pagination::new(i64::MAX, 10).checked_offset(), None);
        assert_eq!(Pagination::new(i64::MAX, 10).offset(), i64::MAX);
    }

    #[test]
    fn total_pages_is_ceiling() {
        let p = Pagination::new(1, 5);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(5), 1);
        assert_eq!(p.total_pages(12), 3);
        assert_eq!(p.total_pages(15), 3);
        assert_eq!(Pagination::unbounded().total_pages(12), 0);
    }

    #[test]
    fn page_sizes_match_remaining_rows() {
        // min(P, max(0, N - P*(k-1)))
        let total: i64 = 12;
        for per_page in 1..=7 {
            for page in 1..=5 {
                let p = Pagination::new(page, per_page);
                let expected = per_page.min((total - p.offset()).max(0));
                let rows = (p.offset()..total).take(per_page as usize).count() as i64;
                assert_eq!(rows, expected, "page {} per_page {}", page, per_page);
            }
        }
    }

    #[test]
    fn parses_sort_direction() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse(" desc "), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Too many filter fields: {0}")]
    TooManyConditions(usize),

    #[error("Refusing to build an unconditional statement for {0}")]
    MissingCondition(String),

    #[error("Invalid order direction: {0}")]
    InvalidOrder(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

use std::fmt;

use crate::data::DataFrame;
use crate::error::Result;

/// Identifies a DataFrame column by name or by 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl ColumnRef {
    /// Resolve to the column's name, checking that it exists.
    pub fn resolve(&self, df: &DataFrame) -> Result<String> {
        match self {
            ColumnRef::Name(name) => {
                df.get_column(name)?;
                Ok(name.clone())
            }
            ColumnRef::Index(i) => df.column_name(*i).map(str::to_string),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Name(name) => write!(f, "'{}'", name),
            ColumnRef::Index(i) => write!(f, "#{}", i),
        }
    }
}

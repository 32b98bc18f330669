//! Data types for ClutchDB
//!
//! This module defines the column data types the SQL dialect accepts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Data Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Calendar date
    Date,
    /// Boolean type
    Boolean,
    /// Floating point
    Float,
    /// Variable-length character string
    Varchar,
    /// Integer
    Int,
    /// Fixed-point decimal
    Decimal,
}

impl DataType {
    /// Map an uppercase data type word to its type
    pub fn from_keyword(word: &str) -> Option<DataType> {
        match word.to_uppercase().as_str() {
            "DATE" => Some(DataType::Date),
            "BOOLEAN" => Some(DataType::Boolean),
            "FLOAT" => Some(DataType::Float),
            "VARCHAR" => Some(DataType::Varchar),
            "INT" => Some(DataType::Int),
            "DECIMAL" => Some(DataType::Decimal),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Date => write!(f, "DATE"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Int => write!(f, "INT"),
            DataType::Decimal => write!(f, "DECIMAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keyword() {
        assert_eq!(DataType::from_keyword("int"), Some(DataType::Int));
        assert_eq!(DataType::from_keyword("VARCHAR"), Some(DataType::Varchar));
        assert_eq!(DataType::from_keyword("TEXT"), None);
    }

    #[test]
    fn test_every_lexer_data_type_maps() {
        for word in crate::sql::token::DATA_TYPES {
            let ty = DataType::from_keyword(word).unwrap();
            assert_eq!(ty.to_string(), *word);
        }
    }
}

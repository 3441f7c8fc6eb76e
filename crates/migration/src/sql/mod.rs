//! Row-streaming statement abstractions
//!
//! `Select` is a forward-only cursor, `Upsert` a parameterized writer and
//! `MassUpdate` glues them into a read-transform-write loop that never holds
//! more than the current row (plus whatever the row handler chooses to keep).
//!
//! Parameter and column indexes start at 1, like the positional `?`
//! placeholders they refer to.

pub mod mass_update;
pub mod progress;
pub mod select;
pub mod upsert;

pub use mass_update::{MassUpdate, RowHandler};
pub use progress::{Progress, ProgressLogger};
pub use select::{Row, Select, SelectQuery};
pub use upsert::Upsert;

use crate::backends::DatabaseValue;
use crate::error::{MigrationError, MigrationResult};

/// Positional statement parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: Vec<Option<DatabaseValue>>,
    invalid_index: bool,
}

impl Parameters {
    pub fn set(&mut self, index: usize, value: DatabaseValue) {
        if index == 0 {
            self.invalid_index = true;
            return;
        }
        if self.values.len() < index {
            self.values.resize(index, None);
        }
        self.values[index - 1] = Some(value);
    }

    /// Bound values in placeholder order; every placeholder up to the last
    /// one set must have a value
    pub fn resolve(&self) -> MigrationResult<Vec<DatabaseValue>> {
        if self.invalid_index {
            return Err(MigrationError::Specification(
                "Parameter indexes start at 1".to_string(),
            ));
        }
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                value.clone().ok_or_else(|| {
                    MigrationError::Specification(format!("Parameter {} is not set", i + 1))
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.invalid_index = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ValueKind;

    #[test]
    fn test_parameters_in_placeholder_order() {
        let mut params = Parameters::default();
        params.set(2, DatabaseValue::Int64(42));
        params.set(1, DatabaseValue::from("uuid"));
        assert_eq!(
            params.resolve().unwrap(),
            vec![DatabaseValue::from("uuid"), DatabaseValue::Int64(42)]
        );
    }

    #[test]
    fn test_gap_is_an_error() {
        let mut params = Parameters::default();
        params.set(3, DatabaseValue::Null(ValueKind::String));
        let err = params.resolve().unwrap_err();
        assert!(err.to_string().contains("Parameter 1 is not set"));
    }

    #[test]
    fn test_zero_index_is_an_error() {
        let mut params = Parameters::default();
        params.set(0, DatabaseValue::Bool(true));
        assert!(params.resolve().is_err());
    }
}

//! Conversions between indicator tables and nested maps.
//!
//! Nested maps (`unit_id → year → value`) are the exchange format of the
//! Python bindings and of JSON fixtures. Years missing for a unit become NaN
//! in the table; NaN cells are dropped again on the way out.
use std::collections::BTreeMap;

use ndarray::Array2;

use crate::data::{
    errors::TableResult,
    table::{IndicatorTable, RowKey, ValueDomain, Year},
};

/// `unit_id → year → value`.
pub type NestedTable = BTreeMap<String, BTreeMap<Year, f64>>;

/// Build a table over the union of all years present in `rows`.
///
/// # Errors
/// Any [`TableError`](crate::data::errors::TableError) raised by
/// [`IndicatorTable::new`], e.g. for an empty map or negative values under
/// [`ValueDomain::NonNegative`].
pub fn table_from_nested(
    rows: &NestedTable, unit: &str, domain: ValueDomain,
) -> TableResult<IndicatorTable> {
    let mut years: Vec<Year> = rows.values().flat_map(|r| r.keys().copied()).collect();
    years.sort_unstable();
    years.dedup();

    let mut values = Array2::from_elem((rows.len(), years.len()), f64::NAN);
    let mut keys = Vec::with_capacity(rows.len());
    for (i, (unit_id, series)) in rows.iter().enumerate() {
        for (&year, &value) in series {
            if let Ok(j) = years.binary_search(&year) {
                values[[i, j]] = value;
            }
        }
        keys.push(RowKey::new(unit_id.as_str(), unit));
    }
    IndicatorTable::new(keys, years, values, domain)
}

/// Inverse of [`table_from_nested`]; NaN cells are omitted.
pub fn table_to_nested(table: &IndicatorTable) -> NestedTable {
    let values = table.values();
    table
        .keys()
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let series = table
                .years()
                .iter()
                .enumerate()
                .filter(|&(j, _)| !values[[i, j]].is_nan())
                .map(|(j, &year)| (year, values[[i, j]]))
                .collect();
            (key.unit_id.clone(), series)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::errors::TableError;

    #[test]
    // Purpose
    // -------
    // Verify that ragged nested maps fill gaps with NaN and come back without
    // them.
    //
    // Given
    // -----
    // - A reports 2020 and 2021, B only 2021.
    //
    // Expect
    // ------
    // - Years [2020, 2021]; B/2020 is missing; the round trip drops the gap.
    fn ragged_maps_become_nan_gaps() {
        let mut rows = NestedTable::new();
        rows.insert("A".into(), BTreeMap::from([(2020, 1.0), (2021, 2.0)]));
        rows.insert("B".into(), BTreeMap::from([(2021, 3.0)]));

        let table = table_from_nested(&rows, "million", ValueDomain::NonNegative).unwrap();

        assert_eq!(table.years(), &[2020, 2021]);
        assert_eq!(table.value("B", 2020), None);
        assert_eq!(table.value("B", 2021), Some(3.0));
        assert_eq!(table_to_nested(&table), rows);
    }

    #[test]
    // Purpose
    // -------
    // Ensure value-domain checks still apply to nested input.
    //
    // Given
    // -----
    // - A negative population value.
    //
    // Expect
    // ------
    // - `TableError::NegativeValue`.
    fn negative_values_are_rejected_for_non_negative_tables() {
        let mut rows = NestedTable::new();
        rows.insert("A".into(), BTreeMap::from([(2020, -1.0)]));

        let err = table_from_nested(&rows, "million", ValueDomain::NonNegative).unwrap_err();

        assert!(matches!(err, TableError::NegativeValue { .. }));
    }
}

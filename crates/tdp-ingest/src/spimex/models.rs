//! Instrument row model for SPIMEX oil-products reports

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of leading product-code characters forming the oil identifier
const OIL_ID_CHARS: usize = 4;

/// Product-code character range forming the delivery basis identifier
const DELIVERY_BASIS_ID_CHARS: std::ops::Range<usize> = 4..7;

/// One traded instrument row parsed from a daily report
///
/// The identifier fields `oil_id`, `delivery_basis_id` and `delivery_type_id`
/// are fixed-offset slices of the exchange product code. `id` is assigned by
/// the database on insert and stays `0` in memory until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeRecord {
    #[serde(default)]
    #[sqlx(default)]
    pub id: i64,
    pub exchange_product_id: String,
    pub exchange_product_name: String,
    pub oil_id: String,
    pub delivery_basis_id: String,
    pub delivery_basis_name: String,
    pub delivery_type_id: String,
    pub volume: f64,
    pub total: f64,
    pub count: f64,
    pub trade_date: NaiveDate,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl TradeRecord {
    /// Build a record from the raw report cells of one data row
    pub fn new(
        exchange_product_id: String,
        exchange_product_name: String,
        delivery_basis_name: String,
        volume: f64,
        total: f64,
        count: f64,
        trade_date: NaiveDate,
    ) -> Self {
        let oil_id = slice_chars(&exchange_product_id, 0, OIL_ID_CHARS);
        let delivery_basis_id = slice_chars(
            &exchange_product_id,
            DELIVERY_BASIS_ID_CHARS.start,
            DELIVERY_BASIS_ID_CHARS.end,
        );
        let delivery_type_id = exchange_product_id
            .chars()
            .last()
            .map(String::from)
            .unwrap_or_default();

        Self {
            id: 0,
            exchange_product_id,
            exchange_product_name,
            oil_id,
            delivery_basis_id,
            delivery_basis_name,
            delivery_type_id,
            volume,
            total,
            count,
            trade_date,
            created_on: Utc::now(),
            updated_on: None,
        }
    }
}

/// Character-based saturating slice: codes shorter than the requested range
/// yield a truncated (possibly empty) identifier rather than failing.
fn slice_chars(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record_for(code: &str) -> TradeRecord {
        TradeRecord::new(
            code.to_string(),
            "Product".to_string(),
            "Basis".to_string(),
            1.0,
            2.0,
            3.0,
            NaiveDate::from_ymd_opt(2023, 7, 13).unwrap(),
        )
    }

    #[test]
    fn test_identifier_derivation() {
        let record = record_for("A1234XYZ");
        assert_eq!(record.oil_id, "A123");
        assert_eq!(record.delivery_basis_id, "4XY");
        assert_eq!(record.delivery_type_id, "Z");
    }

    #[test]
    fn test_short_code_truncates() {
        let record = record_for("A1B");
        assert_eq!(record.oil_id, "A1B");
        assert_eq!(record.delivery_basis_id, "");
        assert_eq!(record.delivery_type_id, "B");
    }

    #[test]
    fn test_new_record_is_transient() {
        let record = record_for("A100ANS060F");
        assert_eq!(record.id, 0);
        assert!(record.updated_on.is_none());
    }

    proptest! {
        #[test]
        fn prop_identifiers_are_code_slices(code in "[A-Z0-9]{7,12}") {
            let record = record_for(&code);
            let chars: Vec<char> = code.chars().collect();

            prop_assert_eq!(record.oil_id, chars[..4].iter().collect::<String>());
            prop_assert_eq!(
                record.delivery_basis_id,
                chars[4..7].iter().collect::<String>()
            );
            prop_assert_eq!(
                record.delivery_type_id,
                chars[chars.len() - 1].to_string()
            );
        }
    }
}

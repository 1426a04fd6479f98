//! Transaction records extracted from a receipt.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::Category;
use crate::coerce;

/// Keys the model is asked to produce for every transaction.
pub const RECORD_KEYS: [&str; 4] = ["date", "merchant", "amount", "category"];

/// One transaction. Every field is optional, but a record is never wholly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: Option<NaiveDate>,
    pub merchant: Option<String>,
    /// Signed; currency symbols already stripped
    pub amount: Option<f64>,
    pub category: Option<Category>,
}

/// A row of sheet cells: `[date, merchant, amount, category]`.
pub type Row = Vec<Value>;

impl TransactionRecord {
    /// Normalize one JSON object from the model. Returns `None` when no field survives.
    pub fn from_json(obj: &Map<String, Value>) -> Option<Self> {
        let record = Self {
            date: coerce::coerce_date(obj.get("date")),
            merchant: coerce::coerce_merchant(obj.get("merchant")),
            amount: coerce::coerce_amount(obj.get("amount")),
            category: coerce::coerce_category(obj.get("category")),
        };
        if record.is_empty() { None } else { Some(record) }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.merchant.is_none()
            && self.amount.is_none()
            && self.category.is_none()
    }

    /// Fixed-width sheet row. Missing fields become empty cells; amount stays numeric.
    pub fn to_row(&self) -> Row {
        vec![
            Value::String(self.date_text()),
            Value::String(self.merchant.clone().unwrap_or_default()),
            self.amount.map(Value::from).unwrap_or_else(|| Value::String(String::new())),
            Value::String(self.category.map(|c| c.label().to_string()).unwrap_or_default()),
        ]
    }

    pub fn date_text(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Amount with two decimals, or empty.
    pub fn amount_text(&self) -> String {
        self.amount.map(|a| format!("{a:.2}")).unwrap_or_default()
    }
}

/// Render a cell the way a plain-text sink stores it.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_json_full() {
        let r = TransactionRecord::from_json(&obj(json!({
            "date": "2024-05-01",
            "merchant": "Cafe X",
            "amount": "12.50",
            "category": "Dining & Drinks"
        })))
        .unwrap();
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(r.merchant.as_deref(), Some("Cafe X"));
        assert_eq!(r.amount, Some(12.5));
        assert_eq!(r.category, Some(Category::DiningDrinks));
    }

    #[test]
    fn test_from_json_missing_keys_become_none() {
        let r = TransactionRecord::from_json(&obj(json!({"merchant": "Shop Y"}))).unwrap();
        assert_eq!(r.merchant.as_deref(), Some("Shop Y"));
        assert!(r.date.is_none());
        assert!(r.amount.is_none());
        assert!(r.category.is_none());
    }

    #[test]
    fn test_from_json_degrades_bad_fields() {
        let r = TransactionRecord::from_json(&obj(json!({
            "date": null,
            "merchant": "Shop Y",
            "amount": "n/a",
            "category": "Misc"
        })))
        .unwrap();
        assert_eq!(
            r,
            TransactionRecord {
                merchant: Some("Shop Y".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_from_json_drops_empty() {
        assert!(TransactionRecord::from_json(&Map::new()).is_none());
        assert!(
            TransactionRecord::from_json(&obj(json!({
                "date": "", "merchant": "", "amount": "", "category": ""
            })))
            .is_none()
        );
        assert!(
            TransactionRecord::from_json(&obj(json!({"category": "Misc", "amount": "N/A"})))
                .is_none()
        );
    }

    #[test]
    fn test_to_row() {
        let r = TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            merchant: Some("Cafe X".to_string()),
            amount: Some(12.5),
            category: Some(Category::DiningDrinks),
        };
        assert_eq!(
            r.to_row(),
            vec![
                json!("2024-05-01"),
                json!("Cafe X"),
                json!(12.5),
                json!("Dining & Drinks")
            ]
        );

        let sparse = TransactionRecord {
            merchant: Some("Shop Y".to_string()),
            ..Default::default()
        };
        assert_eq!(sparse.to_row(), vec![json!(""), json!("Shop Y"), json!(""), json!("")]);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(12.5)), "12.5");
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&Value::Null), "");
    }
}

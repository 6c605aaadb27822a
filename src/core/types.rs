use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Largest magnitude an f64 holds without losing integer precision (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Whole amounts go back to disk as JSON integers (`15`, not `15.0`).
fn whole_as_integer<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// One income or expense line. Both collections share the same shape.
/// Fields this crate does not know about are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Entry {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "valor", serialize_with = "whole_as_integer")]
    pub amount: f64,
    #[serde(rename = "data", default)]
    pub date: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Investment {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "quantidade", serialize_with = "whole_as_integer")]
    pub quantity: f64,
    #[serde(rename = "valor", serialize_with = "whole_as_integer")]
    pub amount: f64,
    #[serde(rename = "data", default)]
    pub date: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Recurring monthly totals, stored as a singleton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FixedAmounts {
    #[serde(rename = "ganhos", serialize_with = "whole_as_integer")]
    pub income_total: f64,
    #[serde(rename = "gastos", serialize_with = "whole_as_integer")]
    pub expense_total: f64,
}

/// The whole persisted state. Missing top-level keys deserialize to their
/// empty defaults; keys this crate does not know about are written back
/// after `fixos`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Document {
    #[serde(rename = "investimentos", default)]
    pub investments: Vec<Investment>,
    #[serde(rename = "gastos", default)]
    pub expenses: Vec<Entry>,
    #[serde(rename = "ganhos", default)]
    pub incomes: Vec<Entry>,
    #[serde(rename = "fixos", default)]
    pub fixed: FixedAmounts,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub name: String,
    pub amount: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub name: String,
    pub kind: String,
    pub quantity: f64,
    pub amount: f64,
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_amounts_serialize_without_fraction() {
        let investment = Investment {
            name: "XYZ".to_string(),
            kind: "ação".to_string(),
            quantity: 15.0,
            amount: 150.25,
            date: "2024-01-01".to_string(),
            ..Investment::default()
        };
        let raw = serde_json::to_string(&investment).unwrap();
        assert!(raw.contains("\"quantidade\":15,"), "unexpected {raw}");
        assert!(raw.contains("\"valor\":150.25"), "unexpected {raw}");
    }

    #[test]
    fn entry_keeps_unknown_fields_and_tolerates_missing_date() {
        let entry: Entry =
            serde_json::from_value(json!({"nome": "Luz", "valor": 120, "categoria": "casa"}))
                .unwrap();
        assert_eq!(entry.date, "");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"nome": "Luz", "valor": 120, "data": "", "categoria": "casa"})
        );
    }
}

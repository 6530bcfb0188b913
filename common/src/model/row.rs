use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single cell value of a data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// The text a cell contributes to a document. `Null` renders as an empty string,
/// whole numbers render without a fractional part.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// One record of the data source: column name to scalar, in source column order.
///
/// Serialized as a JSON object. Column order is preserved in both directions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRow {
    columns: Vec<(String, Scalar)>,
}

impl DataRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(column, value);
        self
    }

    /// `None` when the column is absent from this row.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for DataRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DataRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = DataRow;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DataRow, A::Error> {
                let mut row = DataRow {
                    columns: Vec::with_capacity(map.size_hint().unwrap_or(0)),
                };
                while let Some((column, value)) = map.next_entry::<String, Scalar>()? {
                    row.insert(column, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_column_order_through_json() {
        let json = r#"{"zeta": "z", "alpha": 1, "mid": true, "none": null}"#;
        let row: DataRow = serde_json::from_str(json).unwrap();
        let names: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid", "none"]);
        assert_eq!(row.get("alpha"), Some(&Scalar::Number(1.0)));
        assert_eq!(row.get("none"), Some(&Scalar::Null));
        assert_eq!(row.get("missing"), None);

        let back = serde_json::to_string(&row).unwrap();
        assert_eq!(back, r#"{"zeta":"z","alpha":1.0,"mid":true,"none":null}"#);
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Number(42.0).to_string(), "42");
        assert_eq!(Scalar::Number(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Null.to_string(), "");
        assert_eq!(Scalar::Bool(false).to_string(), "false");
        assert_eq!(Scalar::from("Ada").to_string(), "Ada");
    }

    #[test]
    fn insert_replaces_existing_column() {
        let row = DataRow::new().with("name", "A").with("name", "B");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("name"), Some(&Scalar::from("B")));
    }
}

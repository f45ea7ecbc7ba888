use std::collections::HashMap;
use std::fmt;

/// A single field value as delivered by the data layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view of the value. Only `Num` qualifies; booleans and
    /// numeric looking strings stay textual.
    pub fn number(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Textual view of the value, None for Null.
    pub fn text(&self) -> Option<String> {
        match self {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Num(n) => Some(format_number(*n)),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Null => None,
        }
    }
}

// Whole numbers render without a trailing ".0" so that filter values
// like "3" match a Num(3.0) bedrooms field.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "∅"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Num(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Num(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// One row of back office data. An opaque mapping of field names to
/// scalar values, owned by the data layer and never mutated here.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Clone of the field value, Null when the field is absent.
    pub fn value(&self, key: &str) -> FieldValue {
        self.fields.get(key).cloned().unwrap_or(FieldValue::Null)
    }

    /// Record identity: the `id` field when present. Hosts fall back to
    /// the positional index of the record in the collection.
    pub fn id(&self) -> Option<String> {
        self.fields.get("id").and_then(|v| v.text())
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_field_is_null() {
        let r = Record::new().with("name", "Casa Azul");
        assert_eq!(r.value("price"), FieldValue::Null);
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(FieldValue::Num(3.0).text().unwrap(), "3");
        assert_eq!(FieldValue::Num(2.5).text().unwrap(), "2.5");
    }

    #[test]
    fn null_renders_as_placeholder() {
        assert_eq!(FieldValue::Null.to_string(), "∅");
        assert_eq!(FieldValue::Null.text(), None);
    }

    #[test]
    fn record_id_prefers_id_field() {
        let r = Record::new().with("id", "prop-17").with("name", "Loft");
        assert_eq!(r.id().as_deref(), Some("prop-17"));
        assert_eq!(Record::new().id(), None);
    }
}

//! Ordered column→value row image.

use rusqlite::types::Value;

/// One result row as `(column name, value)` pairs in result-column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. A repeated name shadows nothing; `get` returns the first.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in result order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::Row;
    use rusqlite::types::Value;

    #[test]
    fn row_keeps_column_order_and_first_match_wins() {
        let mut row = Row::new();
        row.push("post_id", Value::Integer(1));
        row.push("post_title", Value::Text("A".to_string()));
        row.push("post_id", Value::Integer(9));

        assert_eq!(
            row.names().collect::<Vec<_>>(),
            vec!["post_id", "post_title", "post_id"]
        );
        assert_eq!(row.get("post_id"), Some(&Value::Integer(1)));
        assert!(!row.contains("missing"));
    }
}

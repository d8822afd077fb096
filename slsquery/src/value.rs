use indexmap::{IndexMap, IndexSet};

/// Reserved column holding the primary timestamp of a log.
pub const FIELD_TIME: &str = "__time__";
/// Reserved column holding the source address of a log.
pub const FIELD_SOURCE: &str = "__source__";

/// One schema-less result row; keys keep the order the backend returned them in.
pub type Record = IndexMap<String, String>;

/// The rows returned by one query, plus the columns they use.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    rows: Vec<Record>,
    /// Union of all row keys, in first-seen order.
    columns: Vec<String>,
    /// Key schema declared by the backend, if any.
    schema: Vec<String>,
}

impl RecordSet {
    pub fn new(rows: Vec<Record>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|row| row.keys())
            .collect::<IndexSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        Self {
            rows,
            columns,
            schema: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: Vec<String>) -> Self {
        self.schema = schema;
        self
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of `key` in row order, skipping rows that lack the key.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .filter_map(move |row| row.get(key).map(String::as_str))
    }

    /// Returns true if every row carries `key`.
    pub fn is_dense(&self, key: &str) -> bool {
        self.rows.iter().all(|row| row.contains_key(key))
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Builds a record from string pairs.
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_columns_first_seen_order() {
        let records = RecordSet::new(vec![
            record([("b", "1"), ("a", "2")]),
            record([("c", "3"), ("a", "4")]),
        ]);
        expect![[r#"
            [
                "b",
                "a",
                "c",
            ]
        "#]]
        .assert_debug_eq(&records.columns());
    }

    #[test]
    fn test_values_skip_missing() {
        let records = RecordSet::new(vec![
            record([("a", "1")]),
            record([("b", "2")]),
            record([("a", "3")]),
        ]);
        assert_eq!(records.values("a").collect::<Vec<_>>(), ["1", "3"]);
        assert!(!records.is_dense("a"));
        assert!(RecordSet::default().is_dense("a"));
    }
}

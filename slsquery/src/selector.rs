/// Separates the group-label key from the value key of a flow graph selector.
pub const GROUP_SEPARATOR: &str = "#:#";

/// Column selection parsed from a query's `ycol` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    /// `a,b,c`
    List(Vec<String>),
    /// `label#:#value`
    Grouped(Vec<String>),
}

impl ColumnSelector {
    pub fn parse(text: &str) -> Self {
        if text.contains(GROUP_SEPARATOR) {
            ColumnSelector::Grouped(split(text, GROUP_SEPARATOR))
        } else {
            ColumnSelector::List(split(text, ","))
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            ColumnSelector::List(v) | ColumnSelector::Grouped(v) => v,
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, ColumnSelector::Grouped(_))
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// The first two columns, used as (label, value) by dual-key shapes.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match self.columns() {
            [label, value, ..] => Some((label.as_str(), value.as_str())),
            _ => None,
        }
    }
}

impl Default for ColumnSelector {
    fn default() -> Self {
        ColumnSelector::List(Vec::new())
    }
}

fn split(text: &str, sep: &str) -> Vec<String> {
    text.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ColumnSelector::parse(""), ColumnSelector::default());
        assert_eq!(
            ColumnSelector::parse("a, b,,c"),
            ColumnSelector::List(vec!["a".into(), "b".into(), "c".into()])
        );
        let grouped = ColumnSelector::parse("host#:#pv");
        assert!(grouped.is_grouped());
        assert_eq!(grouped.pair(), Some(("host", "pv")));
    }

    #[test]
    fn test_pair_needs_two_parts() {
        assert_eq!(ColumnSelector::parse("host#:#").pair(), None);
        assert_eq!(ColumnSelector::parse("host").pair(), None);
        assert_eq!(ColumnSelector::parse("host,pv,x").pair(), Some(("host", "pv")));
    }
}

use crate::stmt::{Direction, Document, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name is unique within the schema
    pub name: String,

    /// The table being indexed
    pub table: String,

    /// Fields included in the index, in order
    pub keys: Vec<IndexKey>,

    /// When `true`, indexed entries are unique
    pub unique: bool,

    /// Only rows matching this selector are indexed
    pub partial_filter: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexOptions {
    pub unique: bool,
    pub partial_filter_expression: Option<Document>,
    /// Overrides the derived `idx_<Table>_<fields>` name.
    pub name: Option<String>,
}

impl IndexOptions {
    pub fn new() -> IndexOptions {
        IndexOptions::default()
    }

    pub fn unique(mut self, unique: bool) -> IndexOptions {
        self.unique = unique;
        self
    }

    pub fn partial_filter_expression(mut self, filter: Document) -> IndexOptions {
        self.partial_filter_expression = Some(filter);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> IndexOptions {
        self.name = Some(name.into());
        self
    }
}

impl IndexKey {
    pub fn asc(field: impl Into<String>) -> IndexKey {
        IndexKey {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> IndexKey {
        IndexKey {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parses a `{a: 1, b: -1}` key specification.
    pub fn parse_spec(spec: &Document) -> Result<Vec<IndexKey>> {
        if spec.is_empty() {
            return Err(Error::invalid_statement("index requires at least one key"));
        }
        spec.iter()
            .map(|(field, value)| {
                Ok(IndexKey {
                    field: field.to_string(),
                    direction: Direction::parse(field, value)?,
                })
            })
            .collect()
    }
}

impl Index {
    pub fn new(table: &str, keys: Vec<IndexKey>, options: &IndexOptions) -> Index {
        let name = match &options.name {
            Some(name) => name.clone(),
            None => Index::default_name(table, &keys, options.partial_filter_expression.is_some()),
        };

        Index {
            name,
            table: table.to_string(),
            keys,
            unique: options.unique,
            partial_filter: options.partial_filter_expression.clone(),
        }
    }

    /// `idx_<Table>_<field>_<field>[_filtered]`, with dots in field paths
    /// replaced by `__`.
    pub fn default_name(table: &str, keys: &[IndexKey], filtered: bool) -> String {
        let mut name = format!("idx_{table}");
        for key in keys {
            name.push('_');
            name.push_str(&key.field.replace('.', "__"));
        }
        if filtered {
            name.push_str("_filtered");
        }
        name
    }

    /// Whether this index has the same identity as the requested one.
    pub fn matches(&self, keys: &[IndexKey], options: &IndexOptions) -> bool {
        let named = options.name.as_ref().map_or(true, |name| *name == self.name);
        named
            && self.keys == keys
            && self.unique == options.unique
            && self.partial_filter == options.partial_filter_expression
    }

    pub fn key_spec(&self) -> Document {
        self.keys
            .iter()
            .map(|key| (key.field.clone(), key.direction.to_value()))
            .collect()
    }

    /// The index description reported by `indexes()`.
    pub fn details(&self) -> Document {
        let mut details = Document::new();
        details.insert("v", 2);
        details.insert("key", self.key_spec());
        details.insert("name", self.name.clone());
        if self.unique {
            details.insert("unique", true);
        }
        if let Some(filter) = &self.partial_filter {
            details.insert("partialFilterExpression", Value::Document(filter.clone()));
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        let keys = vec![IndexKey::asc("a"), IndexKey::desc("c.d")];
        assert_eq!(Index::default_name("Posts", &keys, false), "idx_Posts_a_c__d");
        assert_eq!(
            Index::default_name("Posts", &keys, true),
            "idx_Posts_a_c__d_filtered"
        );
    }

    #[test]
    fn identity() {
        let index = Index::new("Posts", vec![IndexKey::asc("a")], &IndexOptions::new());
        assert!(index.matches(&[IndexKey::asc("a")], &IndexOptions::new()));
        assert!(!index.matches(&[IndexKey::desc("a")], &IndexOptions::new()));
        assert!(!index.matches(&[IndexKey::asc("a")], &IndexOptions::new().unique(true)));
    }
}

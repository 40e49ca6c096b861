use super::{Condition, Document, Value};
use crate::{Error, Result};

/// A parsed Mongo-style filter.
///
/// Top-level clauses are implicitly AND-combined. An empty selector matches
/// every row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Selector {
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// One or more conditions on a (possibly dotted) field.
    Field {
        field: String,
        conditions: Vec<Condition>,
    },
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Nor(Vec<Selector>),
}

impl Selector {
    /// A selector matching every row.
    pub fn all() -> Selector {
        Selector::default()
    }

    /// The `{_id: id}` selector a bare string stands for.
    pub fn id(id: impl Into<String>) -> Selector {
        Selector {
            clauses: vec![Clause::Field {
                field: "_id".to_string(),
                conditions: vec![Condition::Eq(Value::String(id.into()))],
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn parse(doc: &Document) -> Result<Selector> {
        let mut clauses = vec![];

        for (key, value) in doc.iter() {
            match key {
                "$comment" => {}
                "$and" => clauses.push(Clause::And(parse_combinator(key, value)?)),
                "$or" => clauses.push(Clause::Or(parse_combinator(key, value)?)),
                "$nor" => clauses.push(Clause::Nor(parse_combinator(key, value)?)),
                _ if key.starts_with('$') => {
                    return Err(Error::not_implemented(format!("selector operator {key}")))
                }
                field => {
                    let conditions = Condition::parse_list(field, value)?;
                    // `{a: {$comment: ".."}}` carries no condition at all
                    if !conditions.is_empty() {
                        clauses.push(Clause::Field {
                            field: field.to_string(),
                            conditions,
                        });
                    }
                }
            }
        }

        Ok(Selector { clauses })
    }

    /// AND-combines two selectors.
    pub fn and(mut self, other: Selector) -> Selector {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        if self.clauses.len() == 1 && other.clauses.len() == 1 {
            self.clauses.extend(other.clauses);
            return self;
        }
        Selector {
            clauses: vec![Clause::And(vec![self, other])],
        }
    }

    /// Top-level plain equality clauses, in source order.
    ///
    /// These are the fields an upsert copies into the inserted row and uses
    /// as its conflict target.
    pub fn equality_fields(&self) -> Vec<(&str, &Value)> {
        self.clauses
            .iter()
            .filter_map(|clause| match clause {
                Clause::Field { field, conditions } => match &conditions[..] {
                    [Condition::Eq(value)] if !field.contains('.') => Some((field.as_str(), value)),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }
}

fn parse_combinator(op: &str, value: &Value) -> Result<Vec<Selector>> {
    let selectors = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Document(doc) => Selector::parse(doc),
                other => Err(Error::invalid_statement(format!(
                    "{op} expects sub-selectors, got {}",
                    other.kind_name()
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        // The object form is shorthand for one sub-selector per key
        Value::Document(doc) => doc
            .iter()
            .map(|(key, value)| {
                let mut sub = Document::new();
                sub.insert(key, value.clone());
                Selector::parse(&sub)
            })
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(Error::invalid_statement(format!(
                "{op} expects an array or an object, got {}",
                other.kind_name()
            )))
        }
    };

    if selectors.is_empty() {
        return Err(Error::invalid_statement(format!(
            "{op} requires at least one sub-selector"
        )));
    }

    Ok(selectors)
}

/// Conversion into a [`Selector`], accepted wherever a query takes a filter.
///
/// Strings select by `_id`; `()` selects everything.
pub trait IntoSelector {
    fn into_selector(self) -> Result<Selector>;
}

impl IntoSelector for Selector {
    fn into_selector(self) -> Result<Selector> {
        Ok(self)
    }
}

impl IntoSelector for &Selector {
    fn into_selector(self) -> Result<Selector> {
        Ok(self.clone())
    }
}

impl IntoSelector for Document {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(&self)
    }
}

impl IntoSelector for &Document {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(self)
    }
}

impl IntoSelector for &str {
    fn into_selector(self) -> Result<Selector> {
        Ok(Selector::id(self))
    }
}

impl IntoSelector for String {
    fn into_selector(self) -> Result<Selector> {
        Ok(Selector::id(self))
    }
}

impl IntoSelector for () {
    fn into_selector(self) -> Result<Selector> {
        Ok(Selector::all())
    }
}

impl<T: IntoSelector> IntoSelector for Option<T> {
    fn into_selector(self) -> Result<Selector> {
        match self {
            Some(selector) => selector.into_selector(),
            None => Ok(Selector::all()),
        }
    }
}

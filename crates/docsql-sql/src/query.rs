use crate::serializer::Serializer;

use docsql_core::stmt::Value;

/// A query in its linear form: a sequence of atoms joined by single spaces
/// when compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    atoms: Vec<Atom>,

    /// When `true`, nested subqueries are followed by their alias (`A`, `B`,
    /// ..). `FROM ( .. )` needs one; `IN ( .. )` must not have one.
    name_subqueries: bool,
}

/// A single compiled token.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Raw(String),
    Arg(Arg),
    /// A quoted table name
    Table(String),
    Subquery(Box<Query>),
}

/// A positional argument, rendered `$n` or `$n::<hint>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub value: Value,
    pub type_hint: Option<String>,
}

/// A compiled query, ready for a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Query {
    pub fn new() -> Query {
        Query {
            atoms: vec![],
            name_subqueries: true,
        }
    }

    /// A query whose subqueries render without an alias.
    pub(crate) fn unnamed() -> Query {
        Query {
            atoms: vec![],
            name_subqueries: false,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn names_subqueries(&self) -> bool {
        self.name_subqueries
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: impl Into<Atom>) {
        self.atoms.push(atom.into());
    }

    pub fn compile(&self) -> Compiled {
        self.compile_after(vec![])
    }

    /// Compiles with `args` already bound: the first placeholder of this
    /// query is `$<args.len() + 1>`.
    pub fn compile_after(&self, mut args: Vec<Value>) -> Compiled {
        let sql = Serializer::postgresql().serialize(self, &mut args);
        Compiled { sql, args }
    }
}

impl Default for Query {
    fn default() -> Query {
        Query::new()
    }
}

impl Extend<Atom> for Query {
    fn extend<T: IntoIterator<Item = Atom>>(&mut self, iter: T) {
        self.atoms.extend(iter);
    }
}

impl Arg {
    pub fn new(value: impl Into<Value>) -> Arg {
        Arg {
            value: value.into(),
            type_hint: None,
        }
    }

    pub fn typed(value: impl Into<Value>, hint: impl Into<String>) -> Arg {
        Arg {
            value: value.into(),
            type_hint: Some(hint.into()),
        }
    }

    /// Carries the value's own hint, if it has one.
    pub(crate) fn hinted(value: &Value) -> Arg {
        Arg {
            value: value.clone(),
            type_hint: value.type_hint().map(str::to_string),
        }
    }

    /// The argument as an SQL literal, for statements that take no
    /// parameters.
    pub(crate) fn to_literal(&self) -> String {
        let literal = self.value.to_sql_literal();
        match &self.type_hint {
            Some(hint) if !self.value.is_null() => format!("{literal}::{hint}"),
            _ => literal,
        }
    }
}

impl Atom {
    pub fn raw(sql: impl Into<String>) -> Atom {
        Atom::Raw(sql.into())
    }
}

/// Replaces every argument with its literal form.
pub(crate) fn inline(atoms: Vec<Atom>) -> Vec<Atom> {
    atoms
        .into_iter()
        .map(|atom| match atom {
            Atom::Arg(arg) => Atom::Raw(arg.to_literal()),
            Atom::Subquery(query) => Atom::Subquery(Box::new(Query {
                atoms: inline(query.atoms),
                name_subqueries: query.name_subqueries,
            })),
            atom => atom,
        })
        .collect()
}

impl From<&str> for Atom {
    fn from(value: &str) -> Atom {
        Atom::Raw(value.to_string())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Atom {
        Atom::Raw(value)
    }
}

impl From<Arg> for Atom {
    fn from(value: Arg) -> Atom {
        Atom::Arg(value)
    }
}

impl From<Query> for Atom {
    fn from(value: Query) -> Atom {
        Atom::Subquery(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_renders_literals() {
        let atoms = inline(vec![
            Atom::raw("\"b\" ="),
            Atom::Arg(Arg::new("it's")),
            Atom::raw("AND"),
            Atom::Arg(Arg::typed(3, "INTEGER")),
        ]);
        let mut query = Query::new();
        query.extend(atoms);
        let compiled = query.compile();
        assert_eq!(compiled.sql, "\"b\" = 'it''s' AND 3::INTEGER");
        assert!(compiled.args.is_empty());
    }

    #[test]
    fn unnamed_subqueries_have_no_alias() {
        let mut inner = Query::new();
        inner.push("SELECT \"_id\" FROM \"T\"");

        let mut query = Query::unnamed();
        query.push("\"_id\" IN");
        query.push(inner);
        assert_eq!(query.compile().sql, "\"_id\" IN ( SELECT \"_id\" FROM \"T\" )");
    }
}

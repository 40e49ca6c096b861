use crate::stmt::{Document, Value};
use crate::Result;

use std::{collections::BTreeMap, fmt, sync::Arc};

pub type SqlResolverFn = Arc<dyn Fn(&mut dyn SqlResolverContext) -> Result<String> + Send + Sync>;

pub type CodeResolverFn = Arc<dyn Fn(&Document) -> Result<Value> + Send + Sync>;

/// Describes how a computed field is produced.
///
/// A resolver may compute its value in SQL (as a projected expression, usually
/// over a join), in code over the fetched row, or both. When both are present
/// the SQL form is used.
#[derive(Clone, Default)]
pub struct Resolver {
    /// Output name of the resolved value; defaults to the schema field name.
    pub field_name: Option<String>,
    pub sql: Option<SqlResolverFn>,
    pub code: Option<CodeResolverFn>,
}

impl Resolver {
    pub fn sql(
        f: impl Fn(&mut dyn SqlResolverContext) -> Result<String> + Send + Sync + 'static,
    ) -> Resolver {
        Resolver {
            sql: Some(Arc::new(f)),
            ..Resolver::default()
        }
    }

    pub fn code(f: impl Fn(&Document) -> Result<Value> + Send + Sync + 'static) -> Resolver {
        Resolver {
            code: Some(Arc::new(f)),
            ..Resolver::default()
        }
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Resolver {
        self.field_name = Some(name.into());
        self
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("field_name", &self.field_name)
            .field("sql", &self.sql.is_some())
            .field("code", &self.code.is_some())
            .finish()
    }
}

/// What an SQL resolver can ask of the query being built.
pub trait SqlResolverContext {
    /// A column of the primary table, qualified by its alias.
    fn field(&self, name: &str) -> String;

    /// A column of the current user's row. Resolves to `NULL` values for
    /// anonymous queries.
    fn current_user_field(&self, name: &str) -> String;

    /// Adds (or reuses) a join and returns its alias.
    fn join(&mut self, join: JoinBase) -> JoinAlias;

    /// Appends an argument and returns its placeholder.
    fn arg(&mut self, value: Value) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
        }
    }
}

/// A join request: `kind JOIN "table" ON "alias"."<key>" = <expr> AND ..`.
///
/// `on` maps columns of the joined table to SQL expressions of the query.
/// Two requests are the same join when all three parts are equal; the map
/// makes the comparison independent of the order the conditions were given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinBase {
    pub table: String,
    pub kind: JoinKind,
    pub on: BTreeMap<String, String>,
}

impl JoinBase {
    pub fn new(table: impl Into<String>, kind: JoinKind) -> JoinBase {
        JoinBase {
            table: table.into(),
            kind,
            on: BTreeMap::new(),
        }
    }

    pub fn on(mut self, column: impl Into<String>, expr: impl Into<String>) -> JoinBase {
        self.on.insert(column.into(), expr.into());
        self
    }
}

/// The alias assigned to a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAlias {
    prefix: String,
}

impl JoinAlias {
    pub fn new(prefix: impl Into<String>) -> JoinAlias {
        JoinAlias {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A column of the joined table: `"prefix"."name"`.
    pub fn field(&self, name: &str) -> String {
        format!("\"{}\".\"{}\"", self.prefix, name)
    }
}

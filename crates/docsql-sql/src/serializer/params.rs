use super::{Formatter, ToSql};

use docsql_core::stmt::Value;

/// Collects the arguments of a query as it is serialized.
pub trait Params {
    fn push(&mut self, param: &Value) -> Placeholder;
}

/// A 1-based positional placeholder, rendered `$n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder(pub usize);

impl Params for Vec<Value> {
    fn push(&mut self, value: &Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push('$');
        f.dst.push_str(&self.0.to_string());
    }
}

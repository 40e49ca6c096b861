#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
pub use delim::Comma;

mod ident;
pub use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

use crate::query::{Arg, Atom, Query};

/// Serialize a query to a SQL string
#[derive(Debug, Default, Clone, Copy)]
pub struct Serializer {
    _priv: (),
}

struct Formatter<'a, P> {
    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut P,

    /// Current subquery depth. Subquery aliases are derived from it.
    depth: usize,
}

impl Serializer {
    pub fn postgresql() -> Serializer {
        Serializer::default()
    }

    /// Serializes `query`, pushing every argument onto `params` in the order
    /// its placeholder appears.
    pub fn serialize(&self, query: &Query, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            dst: &mut ret,
            params,
            depth: 0,
        };

        query.to_sql(&mut fmt);
        ret
    }
}

/// Alias of a named subquery: `A` for the outermost, `B` one level down, ...
struct Alias(usize);

impl ToSql for Alias {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let letter = char::from(b'A' + (self.0 % 26) as u8);
        f.dst.push(letter);
    }
}

impl ToSql for &Query {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        for (i, atom) in self.atoms().iter().enumerate() {
            if i > 0 {
                fmt!(f, " ");
            }

            match atom {
                Atom::Subquery(subquery) => {
                    let alias = Alias(f.depth);
                    f.depth += 1;
                    fmt!(f, "( ");
                    (&**subquery).to_sql(f);
                    fmt!(f, " )");
                    f.depth -= 1;

                    if self.names_subqueries() {
                        fmt!(f, " " alias);
                    }
                }
                atom => atom.to_sql(f),
            }
        }
    }
}

impl ToSql for &Atom {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Atom::Raw(sql) => fmt!(f, sql.as_str()),
            Atom::Table(name) => fmt!(f, Ident(name)),
            Atom::Arg(arg) => arg.to_sql(f),
            Atom::Subquery(subquery) => {
                fmt!(f, "( ");
                (&**subquery).to_sql(f);
                fmt!(f, " )");
            }
        }
    }
}

impl ToSql for &Arg {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let placeholder = f.params.push(&self.value);
        fmt!(f, placeholder);

        if let Some(hint) = &self.type_hint {
            fmt!(f, "::" hint.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsql_core::stmt::Value;

    #[test]
    fn nested_subqueries_are_lettered_by_depth() {
        let mut inner = Query::new();
        inner.push("SELECT 1");

        let mut middle = Query::new();
        middle.push("SELECT * FROM");
        middle.push(inner);

        let mut outer = Query::new();
        outer.push("SELECT * FROM");
        outer.push(middle);

        let mut params = Vec::<Value>::new();
        let sql = Serializer::postgresql().serialize(&outer, &mut params);
        assert_eq!(sql, "SELECT * FROM ( SELECT * FROM ( SELECT 1 ) B ) A");
    }

    #[test]
    fn placeholders_continue_after_existing_params() {
        let mut query = Query::new();
        query.push("SELECT");
        query.push(Arg::typed(Value::I64(1), "INTEGER"));

        let mut params = vec![Value::from("already there")];
        let sql = Serializer::postgresql().serialize(&query, &mut params);
        assert_eq!(sql, "SELECT $2::INTEGER");
        assert_eq!(params.len(), 2);
    }
}

use super::Statement;
use crate::{
    compiler::Compiler,
    query::{inline, Atom, Compiled, Query},
    scope::Scope,
    serializer::{Comma, Ident},
};

use docsql_core::{
    schema::{Index, Table},
    stmt::{Direction, Selector},
    Result,
};

/// `CREATE [UNIQUE] INDEX IF NOT EXISTS`, parameter free.
#[derive(Debug, Clone)]
pub struct CreateIndexQuery {
    query: Query,
}

impl CreateIndexQuery {
    pub fn new(table: &Table, index: &Index) -> Result<CreateIndexQuery> {
        let scope = Scope::table(table, "CreateIndexQuery");

        let keys = index
            .keys
            .iter()
            .map(|key| -> Result<String> {
                let column = if scope.contains(&key.field) {
                    Ident(&key.field).to_string()
                } else {
                    // Same expression as the selector compiler emits for
                    // string comparisons, so those can use the index
                    format!("({})", scope.resolve(&key.field, Some("TEXT"))?.sql)
                };
                Ok(match key.direction {
                    Direction::Asc => column,
                    Direction::Desc => format!("{column} DESC"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut query = Query::new();
        query.push(if index.unique {
            "CREATE UNIQUE INDEX IF NOT EXISTS"
        } else {
            "CREATE INDEX IF NOT EXISTS"
        });
        query.push(Ident(&index.name).to_string());
        query.push("ON");
        query.push(Atom::Table(table.name().to_string()));
        query.push("USING btree (");
        query.push(Comma(&keys).to_string());
        query.push(")");

        if let Some(filter) = &index.partial_filter {
            let mut atoms = vec![];
            Compiler::new(&scope).selector(&Selector::parse(filter)?, &mut atoms)?;
            if !atoms.is_empty() {
                query.push("WHERE");
                query.extend(inline(atoms));
            }
        }

        Ok(CreateIndexQuery { query })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

impl Statement {
    pub fn create_index(table: &Table, index: &Index) -> Result<Statement> {
        CreateIndexQuery::new(table, index).map(Statement::from)
    }
}

impl From<CreateIndexQuery> for Statement {
    fn from(value: CreateIndexQuery) -> Self {
        Self::CreateIndex(value)
    }
}

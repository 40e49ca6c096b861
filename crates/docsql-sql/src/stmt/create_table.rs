use super::{column_def::column_def, Statement};
use crate::query::{Atom, Compiled, Query};

use docsql_core::schema::Table;

#[derive(Debug, Clone)]
pub struct CreateTableQuery {
    query: Query,
}

impl CreateTableQuery {
    pub fn new(table: &Table) -> CreateTableQuery {
        let columns = table.fields().map(column_def).collect::<Vec<_>>();

        let mut query = Query::new();
        query.push("CREATE TABLE IF NOT EXISTS");
        query.push(Atom::Table(table.name().to_string()));
        query.push(format!("( {} )", columns.join(", ")));
        CreateTableQuery { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

impl Statement {
    pub fn create_table(table: &Table) -> Statement {
        CreateTableQuery::new(table).into()
    }
}

impl From<CreateTableQuery> for Statement {
    fn from(value: CreateTableQuery) -> Self {
        Self::CreateTable(value)
    }
}

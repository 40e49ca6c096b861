use super::{column_def::column_def, Statement};
use crate::query::{Atom, Compiled, Query};

use docsql_core::{schema::Table, Error, Result};

/// Adds a declared field's column to an existing table.
#[derive(Debug, Clone)]
pub struct AddFieldQuery {
    query: Query,
}

impl AddFieldQuery {
    pub fn new(table: &Table, field: &str) -> Result<AddFieldQuery> {
        let Some(field) = table.field(field) else {
            return Err(Error::unrecognized_field(
                field,
                format!("AddFieldQuery on {:?}", table.name()),
            ));
        };

        let mut query = Query::new();
        query.push("ALTER TABLE");
        query.push(Atom::Table(table.name().to_string()));
        query.push("ADD COLUMN IF NOT EXISTS");
        query.push(column_def(field));
        Ok(AddFieldQuery { query })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

impl Statement {
    pub fn add_field(table: &Table, field: &str) -> Result<Statement> {
        AddFieldQuery::new(table, field).map(Statement::from)
    }
}

impl From<AddFieldQuery> for Statement {
    fn from(value: AddFieldQuery) -> Self {
        Self::AddField(value)
    }
}

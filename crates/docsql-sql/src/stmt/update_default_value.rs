use super::Statement;
use crate::{
    query::{Atom, Compiled, Query},
    serializer::Ident,
};

use docsql_core::{schema::Table, Error, Result};

/// Brings a column's default in line with the field's declared default.
#[derive(Debug, Clone)]
pub struct UpdateDefaultValueQuery {
    query: Query,
}

impl UpdateDefaultValueQuery {
    pub fn new(table: &Table, field: &str) -> Result<UpdateDefaultValueQuery> {
        let Some(field) = table.field(field) else {
            return Err(Error::unrecognized_field(
                field,
                format!("UpdateDefaultValueQuery on {:?}", table.name()),
            ));
        };

        let mut query = Query::new();
        query.push("ALTER TABLE");
        query.push(Atom::Table(table.name().to_string()));
        query.push(format!("ALTER COLUMN {}", Ident(&field.name)));
        query.push(match field.default_value_sql() {
            Some(default) => format!("SET DEFAULT {default}"),
            None => "DROP DEFAULT".to_string(),
        });
        Ok(UpdateDefaultValueQuery { query })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

impl Statement {
    pub fn update_default_value(table: &Table, field: &str) -> Result<Statement> {
        UpdateDefaultValueQuery::new(table, field).map(Statement::from)
    }
}

impl From<UpdateDefaultValueQuery> for Statement {
    fn from(value: UpdateDefaultValueQuery) -> Self {
        Self::UpdateDefaultValue(value)
    }
}

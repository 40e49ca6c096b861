use super::update::filter;
use crate::{
    query::{Atom, Compiled, Query},
    scope::Scope,
};

use docsql_core::{
    schema::Table,
    stmt::{IntoSelector, RemoveOptions},
    Error, Result,
};

#[derive(Debug, Clone)]
pub struct DeleteQuery {
    query: Query,
}

impl DeleteQuery {
    /// Deleting every row requires `no_safety_harness`.
    pub fn new(table: &Table, selector: impl IntoSelector, options: &RemoveOptions) -> Result<DeleteQuery> {
        let selector = selector.into_selector()?;

        if selector.is_empty() && !options.no_safety_harness.unwrap_or(false) {
            return Err(Error::invalid_statement(format!(
                "refusing to delete every row of {:?} without no_safety_harness",
                table.name()
            )));
        }

        let scope = Scope::table(table, "DeleteQuery");

        let mut query = Query::unnamed();
        query.push("DELETE FROM");
        query.push(Atom::Table(table.name().to_string()));
        filter(table, &scope, &selector, options.limit, &mut query)?;
        query.push("RETURNING \"_id\"");

        Ok(DeleteQuery { query })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

use super::Statement;
use crate::{
    query::{Compiled, Query},
    serializer::Ident,
};

/// A statement to drop an index if it exists.
#[derive(Debug, Clone)]
pub struct DropIndexQuery {
    query: Query,
}

impl DropIndexQuery {
    pub fn new(name: &str) -> DropIndexQuery {
        let mut query = Query::new();
        query.push(format!("DROP INDEX IF EXISTS {}", Ident(name)));
        DropIndexQuery { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

impl Statement {
    pub fn drop_index(name: &str) -> Statement {
        DropIndexQuery::new(name).into()
    }
}

impl From<DropIndexQuery> for Statement {
    fn from(value: DropIndexQuery) -> Self {
        Self::DropIndex(value)
    }
}

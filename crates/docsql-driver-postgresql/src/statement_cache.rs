use std::{borrow::Cow, collections::HashMap};

use postgres::{Error, Statement};
use postgres_types::Type;
use tokio_postgres::Client;

/// Number of prepared statements a connection keeps before starting over.
const DEFAULT_CAPACITY: usize = 512;

/// Prepared statements of one connection, keyed by SQL and parameter types.
#[derive(Debug, Clone)]
pub struct StatementCache {
    map: HashMap<Key<'static>, Statement>,
    capacity: usize,
}

impl StatementCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, query: &str, types: &[Type]) -> Option<Statement> {
        self.map.get(&Key::new(query, types)).map(ToOwned::to_owned)
    }

    /// Stores a statement, emptying a full cache first.
    pub fn insert(&mut self, query: &str, types: &[Type], statement: Statement) {
        if self.map.len() >= self.capacity {
            self.map.clear();
        }
        self.map
            .insert(Key::new(query, types).into_owned(), statement);
    }

    /// Prepares `query`, letting the server infer the types of parameters
    /// not listed in `types`.
    pub async fn prepare_typed(
        &mut self,
        client: &Client,
        query: &str,
        types: &[Type],
    ) -> Result<Statement, Error> {
        if let Some(statement) = self.get(query, types) {
            Ok(statement)
        } else {
            let stmt = client.prepare_typed(query, types).await?;
            self.insert(query, types, stmt.clone());
            Ok(stmt)
        }
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key<'a> {
    query: Cow<'a, str>,
    types: Cow<'a, [Type]>,
}

impl<'a> Key<'a> {
    #[must_use]
    pub fn new(query: &'a str, types: &'a [Type]) -> Self {
        Self {
            query: query.into(),
            types: types.into(),
        }
    }

    pub fn into_owned(self) -> Key<'static> {
        Key::<'static> {
            query: self.query.into_owned().into(),
            types: self.types.into_owned().into(),
        }
    }
}

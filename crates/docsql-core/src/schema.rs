mod field;
pub use field::{DefaultValue, Field};

mod index;
pub use index::{Index, IndexKey, IndexOptions};

mod path;
pub use path::{FieldPath, PathStep};

mod resolver;
pub use resolver::{
    CodeResolverFn, JoinAlias, JoinBase, JoinKind, Resolver, SqlResolverContext, SqlResolverFn,
};

mod table;
pub use table::{Table, TableBuilder};

mod ty;
pub use ty::Type;

use crate::{Error, Result};

use indexmap::IndexMap;
use std::sync::Arc;

/// The set of tables known to a database.
#[derive(Debug, Default)]
pub struct Schema {
    tables: IndexMap<String, Arc<Table>>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema::default()
    }

    pub fn add_table(&mut self, table: Table) -> Result<Arc<Table>> {
        if self.collection(table.name()).is_some() {
            return Err(Error::invalid_schema(format!(
                "table {:?} is already registered",
                table.name()
            )));
        }
        let table = Arc::new(table);
        self.tables.insert(table.name().to_string(), table.clone());
        Ok(table)
    }

    /// Builder-style [`Schema::add_table`].
    pub fn with_table(mut self, table: Table) -> Result<Schema> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Looks a table up by its exact name.
    pub fn table(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(name)
    }

    /// Looks a table up by collection name, ignoring case: both `"Posts"` and
    /// `"posts"` find table `Posts`.
    pub fn collection(&self, name: &str) -> Option<&Arc<Table>> {
        self.table(name).or_else(|| {
            self.tables
                .values()
                .find(|table| table.name().eq_ignore_ascii_case(name))
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.values()
    }
}

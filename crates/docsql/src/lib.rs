mod bulk;
pub use bulk::BulkWriter;

mod collection;
pub use collection::Collection;

mod config;
pub use config::{Config, DEFAULT_SLOW_QUERY_THRESHOLD};

mod db;
pub use db::Db;

mod execute;
pub use execute::{is_any_query_pending, pending_queries, ExecuteData};

mod find;
pub use find::{Aggregate, Find};

mod result;
pub use result::{BulkWriteResult, FindOneAndUpdateResult, RemoveResult, UpdateResult};

pub use docsql_core::{async_trait, doc, driver, schema, stmt, Driver, Error, Result, Schema};

/// The SQL builders, for statements the collection API does not cover.
pub use docsql_sql as sql;

#[cfg(feature = "postgresql")]
pub use docsql_driver_postgresql as postgresql;

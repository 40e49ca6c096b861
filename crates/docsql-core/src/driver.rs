use crate::{
    async_trait,
    stmt::{Document, Value},
};

use std::fmt::Debug;

/// Executes compiled SQL against a database.
///
/// Rows come back as documents keyed by column name, with JSON and array
/// columns already decoded.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Runs one parameterized statement and returns the rows it produced.
    async fn query(&self, sql: &str, args: &[Value]) -> crate::Result<Vec<Document>>;

    /// Runs statements without parameters, possibly several separated by
    /// semicolons. Used for DDL.
    async fn batch_execute(&self, sql: &str) -> crate::Result<()> {
        self.query(sql, &[]).await.map(|_| ())
    }
}

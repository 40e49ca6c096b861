use super::Error;
use crate::stmt::Value;

/// Context attached to an error raised while executing a compiled query.
///
/// The driver error is kept as the cause; this link records what was sent so
/// malformed queries can be diagnosed from the log or the returned error.
#[derive(Debug)]
pub(super) struct QueryFailed {
    collection: Box<str>,
    sql: Box<str>,
    args: Vec<Value>,
    data: Box<str>,
}

impl std::error::Error for QueryFailed {}

impl core::fmt::Display for QueryFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "SQL error for {}: `{}`: [", self.collection, self.sql)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str("]")?;
        if !self.data.is_empty() {
            write!(f, ": {}", self.data)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates the context link for a failed query. `data` is a rendering of
    /// the caller's selector, modifier or pipeline.
    pub fn query_failed(
        collection: impl Into<String>,
        sql: impl Into<String>,
        args: Vec<Value>,
        data: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::QueryFailed(QueryFailed {
            collection: collection.into().into(),
            sql: sql.into().into(),
            args,
            data: data.into().into(),
        }))
    }

    /// Returns `true` if this error carries query execution context.
    pub fn is_query_failed(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::QueryFailed(_)))
    }
}

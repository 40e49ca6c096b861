use docsql_core::stmt::Document;

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Number of queries currently executing, across every `Db`.
static EXECUTING_QUERIES: AtomicUsize = AtomicUsize::new(0);

/// Returns `true` while any query is executing. Used by readiness and
/// shutdown checks.
pub fn is_any_query_pending() -> bool {
    pending_queries() > 0
}

/// Number of queries currently executing.
pub fn pending_queries() -> usize {
    EXECUTING_QUERIES.load(Ordering::SeqCst)
}

/// Counts one executing query until dropped.
#[derive(Debug)]
pub(crate) struct InFlight(());

impl InFlight {
    pub(crate) fn enter() -> InFlight {
        EXECUTING_QUERIES.fetch_add(1, Ordering::SeqCst);
        InFlight(())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        EXECUTING_QUERIES.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What the caller asked for, recorded with failed queries.
///
/// Nothing here changes the query except `quiet`, which suppresses the
/// slow-query and failure logs.
#[derive(Debug, Default, Clone)]
pub struct ExecuteData {
    entries: Vec<(&'static str, String)>,
    quiet: bool,
}

impl ExecuteData {
    pub fn new() -> ExecuteData {
        ExecuteData::default()
    }

    /// Records a document, rendered as JSON.
    pub fn document(mut self, name: &'static str, document: &Document) -> ExecuteData {
        self.entries.push((name, document.to_json().to_string()));
        self
    }

    /// Records a list of documents, such as a pipeline.
    pub fn documents(mut self, name: &'static str, documents: &[Document]) -> ExecuteData {
        let rendered = documents
            .iter()
            .map(|document| document.to_json().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.entries.push((name, format!("[{rendered}]")));
        self
    }

    /// Records any value through its `Debug` output.
    pub fn debug(mut self, name: &'static str, value: &impl fmt::Debug) -> ExecuteData {
        self.entries.push((name, format!("{value:?}")));
        self
    }

    pub fn quiet(mut self, quiet: bool) -> ExecuteData {
        self.quiet = quiet;
        self
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub(crate) fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsql_core::doc;

    #[test]
    fn renders_entries_in_order() {
        let data = ExecuteData::new()
            .document("selector", &doc!({ "a": 1 }))
            .documents("pipeline", &[doc!({ "$limit": 2 }), doc!({ "$skip": 1 })])
            .debug("indexName", &"idx_a");
        assert_eq!(
            data.render(),
            r#"selector: {"a":1}, pipeline: [{"$limit":2}, {"$skip":1}], indexName: "idx_a""#
        );
        assert!(!data.is_quiet());
    }
}

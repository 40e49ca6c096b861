use crate::{Collection, ExecuteData};

use docsql_core::{
    stmt::{Document, FindOptions, Selector, Value},
    Result,
};
use docsql_sql::{stmt::SelectOptions, Pipeline, SelectQuery};

/// A pending `find`. Nothing runs until [`Find::fetch`] or [`Find::count`].
#[derive(Debug)]
pub struct Find<'a> {
    pub(crate) collection: &'a Collection,
    pub(crate) selector: Result<Selector>,
    pub(crate) options: FindOptions,
}

impl Find<'_> {
    pub async fn fetch(self) -> Result<Vec<Document>> {
        let selector = self.selector?;
        let select = SelectQuery::new(
            self.collection.table(),
            &selector,
            &self.options,
            self.collection.select_options(),
        )?;
        let data = ExecuteData::new()
            .debug("selector", &selector)
            .debug("options", &self.options)
            .quiet(self.options.quiet);
        self.collection.execute(select, data).await
    }

    pub async fn count(self) -> Result<u64> {
        let selector = self.selector?;
        let select = SelectQuery::new(
            self.collection.table(),
            &selector,
            &self.options,
            self.collection.select_options().count(true),
        )?;
        let data = ExecuteData::new()
            .debug("selector", &selector)
            .debug("options", &self.options)
            .quiet(self.options.quiet);
        let rows = self.collection.execute(select, data).await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .map_or(0, |count| count.max(0) as u64))
    }
}

/// A pending aggregation.
#[derive(Debug)]
pub struct Aggregate<'a> {
    pub(crate) collection: &'a Collection,
    pub(crate) pipeline: Vec<Document>,
    pub(crate) quiet: bool,
}

impl Aggregate<'_> {
    /// Suppresses the slow-query and failure logs.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub async fn to_array(self) -> Result<Vec<Document>> {
        let collection = self.collection;

        let query = Pipeline::new(collection.table(), &self.pipeline)
            .map(|pipeline| pipeline.with_schema(collection.db().schema().clone()))
            .and_then(|pipeline| pipeline.to_query());

        let query = match query {
            Ok(query) => query,
            Err(err) => {
                if !self.quiet {
                    tracing::error!(
                        target: "docsql::query",
                        collection = collection.name(),
                        "aggregate error: {err}: {}",
                        ExecuteData::new().documents("pipeline", &self.pipeline).render()
                    );
                }
                return Err(err);
            }
        };

        let data = ExecuteData::new()
            .documents("pipeline", &self.pipeline)
            .quiet(self.quiet);
        collection.execute(query, data).await
    }
}

impl Collection {
    pub(crate) fn select_options(&self) -> SelectOptions {
        SelectOptions::new().schema(self.db().schema().clone())
    }
}

use crate::{
    bulk::BulkWriter,
    execute::InFlight,
    find::{Aggregate, Find},
    result::{BulkWriteResult, FindOneAndUpdateResult, RemoveResult, UpdateResult},
    Db, ExecuteData,
};

use docsql_core::{
    err,
    schema::{Index, IndexKey, IndexOptions, Table},
    stmt::{
        Document, FindOptions, IntoSelector, Modifier, RemoveOptions, ReturnCount, Selector,
        UpdateOptions, Value,
    },
    Result,
};
use docsql_sql::{
    stmt::{
        AddFieldQuery, CreateIndexQuery, CreateTableQuery, DeleteQuery, DropIndexQuery,
        InsertOptions, InsertQuery, UpdateDefaultValueQuery, UpdateQuery, UpdateQueryOptions,
    },
    ProjectionContext, Statement,
};

use std::{fmt, sync::Arc};

/// One table, queried with document-style selectors and modifiers.
#[derive(Clone)]
pub struct Collection {
    db: Db,
    table: Arc<Table>,
}

impl Collection {
    pub(crate) fn new(db: Db, table: Arc<Table>) -> Collection {
        Collection { db, table }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Runs a statement against this collection. `data` only feeds the
    /// error context and decides whether the execution is logged.
    pub async fn execute(
        &self,
        statement: impl Into<Statement>,
        data: ExecuteData,
    ) -> Result<Vec<Document>> {
        self.db.execute(self.name(), &statement.into(), &data).await
    }

    pub fn find(&self, selector: impl IntoSelector, options: FindOptions) -> Find<'_> {
        Find {
            collection: self,
            selector: selector.into_selector(),
            options,
        }
    }

    /// The first matching row. A `limit` of 1 applies unless `options` sets
    /// its own.
    pub async fn find_one(
        &self,
        selector: impl IntoSelector,
        mut options: FindOptions,
    ) -> Result<Option<Document>> {
        options.limit.get_or_insert(1);
        let rows = self.find(selector, options).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Any one row of the collection.
    pub async fn find_one_arbitrary(&self) -> Result<Option<Document>> {
        self.find_one(Selector::all(), FindOptions::new()).await
    }

    /// Inserts a document and returns its `_id`, generating one when the
    /// document has none.
    pub async fn insert(&self, document: Document) -> Result<String> {
        let options = InsertOptions {
            return_inserted: true,
            ..InsertOptions::default()
        };
        let insert = InsertQuery::new(&self.table, &document, options)?;
        let data = ExecuteData::new().document("data", &document);
        let rows = self.execute(insert, data).await?;

        rows.first()
            .and_then(|row| row.get("_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| err!("insert into {:?} returned no _id", self.name()))
    }

    /// Inserts several documents with one statement, returning their ids in
    /// the order the database reports them.
    pub async fn insert_many(&self, documents: &[Document]) -> Result<Vec<String>> {
        let insert = InsertQuery::many(&self.table, documents, InsertOptions::default())?;
        let data = ExecuteData::new().documents("data", documents);
        let rows = self.execute(insert, data).await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Updates at most one row. With `upsert` the row is inserted when none
    /// matches, and the count reported follows `options.return_count`.
    pub async fn update_one(
        &self,
        selector: impl IntoSelector,
        modifier: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let selector = selector.into_selector()?;
        let parsed = Modifier::parse(modifier)?;
        let data = update_data(&selector, modifier, &options);

        if options.upsert {
            let count = self.upsert(&selector, &parsed, &options, data).await?;
            return Ok(UpdateResult::new(count));
        }

        let update = UpdateQuery::new(
            &self.table,
            &selector,
            &parsed,
            &options,
            UpdateQueryOptions {
                limit: Some(1),
                return_updated: false,
            },
        )?;
        let rows = self.execute(update, data).await?;
        Ok(UpdateResult::new(rows.len() as u64))
    }

    pub async fn update_many(
        &self,
        selector: impl IntoSelector,
        modifier: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let selector = selector.into_selector()?;
        let parsed = Modifier::parse(modifier)?;
        let data = update_data(&selector, modifier, &options);

        let update = UpdateQuery::new(
            &self.table,
            &selector,
            &parsed,
            &options,
            UpdateQueryOptions::default(),
        )?;
        let rows = self.execute(update, data).await?;
        Ok(UpdateResult::new(rows.len() as u64))
    }

    async fn upsert(
        &self,
        selector: &Selector,
        modifier: &Modifier,
        options: &UpdateOptions,
        data: ExecuteData,
    ) -> Result<u64> {
        let upsert = InsertQuery::upsert(&self.table, selector, modifier)?;
        let rows = self.execute(upsert, data).await?;

        let action = rows
            .first()
            .and_then(|row| row.get("action"))
            .and_then(Value::as_str);

        Ok(match (action, options.return_count) {
            (Some("updated"), ReturnCount::Matched) => 1,
            (Some("inserted"), ReturnCount::Upserted) => 1,
            _ => 0,
        })
    }

    /// Updates at most one row and returns it as updated.
    pub async fn find_one_and_update(
        &self,
        selector: impl IntoSelector,
        modifier: &Document,
        options: UpdateOptions,
    ) -> Result<FindOneAndUpdateResult> {
        let selector = selector.into_selector()?;
        let parsed = Modifier::parse(modifier)?;
        let data = update_data(&selector, modifier, &options);

        let update = UpdateQuery::new(
            &self.table,
            &selector,
            &parsed,
            &options,
            UpdateQueryOptions {
                limit: Some(1),
                return_updated: true,
            },
        )?;
        let rows = self.execute(update, data).await?;

        Ok(FindOneAndUpdateResult {
            ok: true,
            value: rows.into_iter().next(),
        })
    }

    /// Deletes matching rows. Unlike [`DeleteQuery`], an empty selector is
    /// allowed unless `options` explicitly sets `no_safety_harness: false`.
    pub async fn remove(
        &self,
        selector: impl IntoSelector,
        mut options: RemoveOptions,
    ) -> Result<RemoveResult> {
        options.no_safety_harness.get_or_insert(true);

        let selector = selector.into_selector()?;
        let delete = DeleteQuery::new(&self.table, &selector, &options)?;
        let data = ExecuteData::new()
            .debug("selector", &selector)
            .debug("options", &options)
            .quiet(options.quiet);
        let rows = self.execute(delete, data).await?;

        Ok(RemoveResult {
            deleted_count: rows.len() as u64,
        })
    }

    /// Creates the index described by the `{field: 1 | -1}` spec unless an
    /// identical one already exists. The index is registered on the table
    /// either way.
    pub async fn ensure_index(&self, spec: &Document, options: IndexOptions) -> Result<Arc<Index>> {
        let keys = IndexKey::parse_spec(spec)?;
        let index = match self.table.get_index(&keys, &options) {
            Some(index) => index,
            None => self.table.add_index(keys, &options)?,
        };

        let create = CreateIndexQuery::new(&self.table, &index)?;
        let data = ExecuteData::new()
            .document("fieldOrSpec", spec)
            .debug("options", &options);
        self.execute(create, data).await?;
        Ok(index)
    }

    pub async fn drop_index(&self, name: &str) -> Result<()> {
        let data = ExecuteData::new().debug("indexName", &name);
        self.execute(DropIndexQuery::new(name), data).await?;
        self.table.remove_index(name);
        Ok(())
    }

    /// Descriptions of the table's registered indexes.
    pub fn indexes(&self) -> Vec<Document> {
        self.table
            .indexes()
            .iter()
            .map(|index| index.details())
            .collect()
    }

    pub fn aggregate(&self, pipeline: Vec<Document>) -> Aggregate<'_> {
        Aggregate {
            collection: self,
            pipeline,
            quiet: false,
        }
    }

    /// Runs the operations in order. All of them are compiled before the
    /// first one executes; execution stops at the first failure.
    pub async fn bulk_write(&self, operations: &[Document]) -> Result<BulkWriteResult> {
        let _in_flight = InFlight::enter();
        BulkWriter::new(self, operations)?.execute().await
    }

    /// Fetches `fields` of matching rows, resolving fields the table defines
    /// resolvers for. `current_user` is the id of the user reading; without
    /// one, fields read from the current user are `NULL`.
    pub async fn fetch_projected(
        &self,
        fields: &[&str],
        selector: impl IntoSelector,
        current_user: Option<&str>,
    ) -> Result<Vec<Document>> {
        let selector = selector.into_selector()?;

        let mut context = ProjectionContext::new(&self.table);
        if current_user.is_some() {
            context.set_current_user(current_user);
        }
        context.project(fields)?;

        let projected = context.compile_query(&selector)?;
        let data = ExecuteData::new()
            .debug("projection", &fields)
            .debug("selector", &selector);
        let rows = self.execute(projected.clone(), data).await?;
        projected.resolve_rows(rows)
    }

    /// Creates the table, when missing, and its registered indexes.
    pub async fn ensure_table(&self) -> Result<()> {
        self.execute(CreateTableQuery::new(&self.table), ExecuteData::new())
            .await?;

        for index in self.table.indexes() {
            let create = CreateIndexQuery::new(&self.table, &index)?;
            let data = ExecuteData::new().debug("indexName", &index.name);
            self.execute(create, data).await?;
        }
        Ok(())
    }

    /// Adds the column of a field declared after the table was created.
    pub async fn add_field(&self, field: &str) -> Result<()> {
        let add = AddFieldQuery::new(&self.table, field)?;
        self.execute(add, ExecuteData::new().debug("field", &field))
            .await?;
        Ok(())
    }

    /// Brings a column's default in line with its field declaration.
    pub async fn update_default_value(&self, field: &str) -> Result<()> {
        let update = UpdateDefaultValueQuery::new(&self.table, field)?;
        self.execute(update, ExecuteData::new().debug("field", &field))
            .await?;
        Ok(())
    }
}

fn update_data(selector: &Selector, modifier: &Document, options: &UpdateOptions) -> ExecuteData {
    ExecuteData::new()
        .debug("selector", selector)
        .document("modifier", modifier)
        .debug("options", options)
        .quiet(options.quiet)
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .finish()
    }
}

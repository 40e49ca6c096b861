use crate::{result::BulkWriteResult, Collection, ExecuteData};

use docsql_core::{
    schema::Table,
    stmt::{BulkOperation, Document, Modifier, RemoveOptions, UpdateOptions, Value},
    Error, Result,
};
use docsql_sql::{
    stmt::{DeleteQuery, InsertOptions, InsertQuery, UpdateQuery, UpdateQueryOptions},
    Statement,
};

/// Runs a list of write operations as one logical batch.
///
/// Every operation is compiled before the first executes, so a malformed
/// operation anywhere in the list means nothing runs. Operations then run in
/// order and the first failure stops the batch.
#[derive(Debug)]
pub struct BulkWriter<'a> {
    collection: &'a Collection,
    steps: Vec<Step>,
}

#[derive(Debug)]
struct Step {
    operation: &'static str,
    kind: StepKind,
    statement: Statement,
    data: ExecuteData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Insert,
    Update,
    Upsert,
    Delete,
}

impl<'a> BulkWriter<'a> {
    pub fn new(collection: &'a Collection, operations: &[Document]) -> Result<BulkWriter<'a>> {
        let steps = operations
            .iter()
            .enumerate()
            .map(|(index, operation)| {
                let parsed = BulkOperation::parse(operation)
                    .map_err(|err| err.context(Error::bulk_write_failed(index, "invalid", 0)))?;
                let name = parsed.name();
                compile(collection.table(), parsed)
                    .map_err(|err| err.context(Error::bulk_write_failed(index, name, 0)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BulkWriter { collection, steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn execute(self) -> Result<BulkWriteResult> {
        let mut result = BulkWriteResult::default();

        for (index, step) in self.steps.into_iter().enumerate() {
            let rows = self
                .collection
                .execute(step.statement, step.data)
                .await
                .map_err(|err| err.context(Error::bulk_write_failed(index, step.operation, index)))?;

            let count = rows.len() as u64;
            match step.kind {
                StepKind::Insert => result.inserted_count += count,
                StepKind::Update => {
                    result.matched_count += count;
                    result.modified_count += count;
                }
                StepKind::Delete => result.deleted_count += count,
                StepKind::Upsert => {
                    for row in &rows {
                        match row.get("action").and_then(Value::as_str) {
                            Some("inserted") => {
                                result.upserted_count += 1;
                                if let Some(id) = row.get("_id").and_then(Value::as_str) {
                                    result.upserted_ids.push((index, id.to_string()));
                                }
                            }
                            Some("updated") => {
                                result.matched_count += 1;
                                result.modified_count += 1;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        Ok(result)
    }
}

fn compile(table: &Table, operation: BulkOperation) -> Result<Step> {
    let name = operation.name();

    let (kind, statement, data) = match operation {
        BulkOperation::InsertOne { document } => {
            let insert = InsertQuery::new(table, &document, InsertOptions::default())?;
            let data = ExecuteData::new().document("data", &document);
            (StepKind::Insert, insert.into(), data)
        }
        BulkOperation::UpdateOne {
            filter,
            update,
            upsert,
        } => update_step(table, &filter, &update, upsert, Some(1))?,
        BulkOperation::UpdateMany {
            filter,
            update,
            upsert,
        } => update_step(table, &filter, &update, upsert, None)?,
        BulkOperation::ReplaceOne {
            filter,
            mut replacement,
            upsert,
        } => {
            replacement.remove("_id");
            let modifier = Modifier::set(replacement.clone());
            let data = ExecuteData::new()
                .document("selector", &filter)
                .document("replacement", &replacement);
            let (kind, statement) = modify(table, &filter, &modifier, upsert, Some(1))?;
            (kind, statement, data)
        }
        BulkOperation::DeleteOne { filter } => delete_step(table, &filter, Some(1))?,
        BulkOperation::DeleteMany { filter } => delete_step(table, &filter, None)?,
    };

    Ok(Step {
        operation: name,
        kind,
        statement,
        data,
    })
}

fn update_step(
    table: &Table,
    filter: &Document,
    update: &Document,
    upsert: bool,
    limit: Option<u64>,
) -> Result<(StepKind, Statement, ExecuteData)> {
    let modifier = Modifier::parse(update)?;
    let data = ExecuteData::new()
        .document("selector", filter)
        .document("modifier", update);
    let (kind, statement) = modify(table, filter, &modifier, upsert, limit)?;
    Ok((kind, statement, data))
}

fn modify(
    table: &Table,
    filter: &Document,
    modifier: &Modifier,
    upsert: bool,
    limit: Option<u64>,
) -> Result<(StepKind, Statement)> {
    if upsert {
        let upsert = InsertQuery::upsert(table, filter, modifier)?;
        return Ok((StepKind::Upsert, upsert.into()));
    }

    let update = UpdateQuery::new(
        table,
        filter,
        modifier,
        &UpdateOptions::default(),
        UpdateQueryOptions {
            limit,
            return_updated: false,
        },
    )?;
    Ok((StepKind::Update, update.into()))
}

fn delete_step(
    table: &Table,
    filter: &Document,
    limit: Option<u64>,
) -> Result<(StepKind, Statement, ExecuteData)> {
    let options = RemoveOptions {
        no_safety_harness: Some(true),
        limit,
        quiet: false,
    };
    let delete = DeleteQuery::new(table, filter, &options)?;
    let data = ExecuteData::new().document("selector", filter);
    Ok((StepKind::Delete, delete.into(), data))
}

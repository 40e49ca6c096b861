use super::{Document, Value};
use crate::{Error, Result};

/// One operation of a bulk write, in the shape document-database drivers
/// accept (`{updateOne: {filter, update, upsert}}`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    InsertOne {
        document: Document,
    },
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateMany {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    ReplaceOne {
        filter: Document,
        replacement: Document,
        upsert: bool,
    },
    DeleteOne {
        filter: Document,
    },
    DeleteMany {
        filter: Document,
    },
}

impl BulkOperation {
    pub fn parse(doc: &Document) -> Result<BulkOperation> {
        let Some((op, Value::Document(body))) = doc.single() else {
            return Err(Error::invalid_statement(
                "bulk operations take exactly one operation object",
            ));
        };

        let get = |name: &str| match body.get(name) {
            Some(Value::Document(value)) => Ok(value.clone()),
            _ => Err(Error::invalid_statement(format!(
                "{op} requires an object {name:?}"
            ))),
        };
        let upsert = body.get("upsert").is_some_and(Value::is_truthy);

        Ok(match op {
            "insertOne" => BulkOperation::InsertOne {
                document: get("document")?,
            },
            "updateOne" => BulkOperation::UpdateOne {
                filter: get("filter")?,
                update: get("update")?,
                upsert,
            },
            "updateMany" => BulkOperation::UpdateMany {
                filter: get("filter")?,
                update: get("update")?,
                upsert,
            },
            "replaceOne" => BulkOperation::ReplaceOne {
                filter: get("filter")?,
                replacement: get("replacement")?,
                upsert,
            },
            "deleteOne" => BulkOperation::DeleteOne {
                filter: get("filter")?,
            },
            "deleteMany" => BulkOperation::DeleteMany {
                filter: get("filter")?,
            },
            _ => return Err(Error::not_implemented(format!("bulk operation {op}"))),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BulkOperation::InsertOne { .. } => "insertOne",
            BulkOperation::UpdateOne { .. } => "updateOne",
            BulkOperation::UpdateMany { .. } => "updateMany",
            BulkOperation::ReplaceOne { .. } => "replaceOne",
            BulkOperation::DeleteOne { .. } => "deleteOne",
            BulkOperation::DeleteMany { .. } => "deleteMany",
        }
    }
}

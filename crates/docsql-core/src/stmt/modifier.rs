use super::{Document, Value};
use crate::{Error, Result};

/// A parsed update specification.
///
/// Each operator keeps its fields in source order, and operators are applied
/// in the order `$set`, `$unset`, `$inc`, `$push`, `$addToSet`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Modifier {
    pub set: Document,
    pub unset: Vec<String>,
    pub inc: Document,
    pub push: Document,
    pub add_to_set: Document,
    /// Only honored by upserts.
    pub set_on_insert: Document,
    /// Plain top-level keys, spread into the row of an upsert.
    pub fields: Document,
}

impl Modifier {
    pub fn parse(doc: &Document) -> Result<Modifier> {
        let mut modifier = Modifier::default();

        for (key, value) in doc.iter() {
            match key {
                "$set" => modifier.set.extend(operand(key, value)?.clone()),
                "$unset" => modifier
                    .unset
                    .extend(operand(key, value)?.keys().map(str::to_string)),
                "$inc" => modifier.inc.extend(operand(key, value)?.clone()),
                "$push" => modifier.push.extend(array_operand(key, value)?),
                "$addToSet" => modifier.add_to_set.extend(array_operand(key, value)?),
                "$setOnInsert" => modifier.set_on_insert.extend(operand(key, value)?.clone()),
                _ if key.starts_with('$') => {
                    return Err(Error::not_implemented(format!("update operator {key}")))
                }
                field => {
                    modifier.fields.insert(field, value.clone());
                }
            }
        }

        Ok(modifier)
    }

    /// Builds a `$set` modifier from a document.
    pub fn set(doc: Document) -> Modifier {
        Modifier {
            set: doc,
            ..Modifier::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.push.is_empty()
            && self.add_to_set.is_empty()
            && self.set_on_insert.is_empty()
            && self.fields.is_empty()
    }
}

fn operand<'a>(op: &str, value: &'a Value) -> Result<&'a Document> {
    value.as_document().ok_or_else(|| {
        Error::invalid_statement(format!(
            "{op} expects an object, got {}",
            value.kind_name()
        ))
    })
}

fn array_operand(op: &str, value: &Value) -> Result<Document> {
    let doc = operand(op, value)?;
    for (field, value) in doc.iter() {
        if let Some(inner) = value.as_document() {
            if let Some(key) = inner.keys().find(|key| key.starts_with('$')) {
                return Err(Error::not_implemented(format!(
                    "{op} modifier {key} on {field:?}"
                )));
            }
        }
    }
    Ok(doc.clone())
}

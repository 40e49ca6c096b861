use super::{Field, FieldPath, Index, IndexKey, IndexOptions, Resolver, Type};
use crate::{Error, Result};

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A database table backing one collection.
///
/// Fields are fixed at construction; the index list is the only part that
/// changes afterwards.
#[derive(Debug)]
pub struct Table {
    name: String,

    /// Columns in declaration order, `_id` first
    fields: IndexMap<String, Field>,

    /// Computed fields, keyed by schema field name
    resolvers: IndexMap<String, Resolver>,

    indexes: RwLock<Vec<Arc<Index>>>,
}

#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    fields: Vec<Field>,
    resolvers: Vec<(String, Resolver)>,
}

impl Table {
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            fields: vec![],
            resolvers: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn resolver(&self, name: &str) -> Option<&Resolver> {
        self.resolvers.get(name)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = (&str, &Resolver)> {
        self.resolvers.iter().map(|(name, resolver)| (name.as_str(), resolver))
    }

    /// Returns the registered index with the same identity, if any.
    pub fn get_index(&self, keys: &[IndexKey], options: &IndexOptions) -> Option<Arc<Index>> {
        self.indexes
            .read()
            .iter()
            .find(|index| index.matches(keys, options))
            .cloned()
    }

    pub fn index_by_name(&self, name: &str) -> Option<Arc<Index>> {
        self.indexes
            .read()
            .iter()
            .find(|index| index.name == name)
            .cloned()
    }

    /// Registers an index, or returns the existing one with the same
    /// identity.
    pub fn add_index(&self, keys: Vec<IndexKey>, options: &IndexOptions) -> Result<Arc<Index>> {
        for key in &keys {
            let known = match FieldPath::parse(&key.field) {
                Some(path) if path.is_column() => self.has_field(&path.column),
                Some(_) => self.is_json_path(&key.field),
                None => false,
            };
            if !known {
                return Err(Error::unrecognized_field(
                    &key.field,
                    format!("CreateIndexQuery on {:?}", self.name),
                ));
            }
        }

        let mut indexes = self.indexes.write();
        if let Some(index) = indexes.iter().find(|index| index.matches(&keys, options)) {
            return Ok(index.clone());
        }

        let index = Arc::new(Index::new(&self.name, keys, options));
        if indexes.iter().any(|existing| existing.name == index.name) {
            return Err(Error::invalid_schema(format!(
                "index {:?} already exists with a different definition",
                index.name
            )));
        }
        indexes.push(index.clone());
        Ok(index)
    }

    /// Forgets an index; returns whether it was registered.
    pub fn remove_index(&self, name: &str) -> bool {
        let mut indexes = self.indexes.write();
        let before = indexes.len();
        indexes.retain(|index| index.name != name);
        indexes.len() != before
    }

    pub fn indexes(&self) -> Vec<Arc<Index>> {
        self.indexes.read().clone()
    }

    fn is_json_path(&self, name: &str) -> bool {
        FieldPath::parse(name)
            .and_then(|path| self.field(&path.column).map(|field| field.ty.clone()))
            .is_some_and(|ty| ty.is_json())
    }
}

impl TableBuilder {
    pub fn field(mut self, field: Field) -> TableBuilder {
        self.fields.push(field);
        self
    }

    pub fn resolver(mut self, name: impl Into<String>, resolver: Resolver) -> TableBuilder {
        self.resolvers.push((name.into(), resolver));
        self
    }

    pub fn build(self) -> Result<Table> {
        if !is_identifier(&self.name) {
            return Err(Error::invalid_schema(format!(
                "invalid table name {:?}",
                self.name
            )));
        }

        let mut fields = IndexMap::new();
        // `_id` is always the first column
        let id = self
            .fields
            .iter()
            .find(|field| field.name == "_id")
            .cloned()
            .unwrap_or_else(|| Field::new("_id", Type::Id).not_null());
        fields.insert(id.name.clone(), id);

        for field in self.fields {
            if field.name == "_id" {
                continue;
            }
            if !is_identifier(&field.name) {
                return Err(Error::invalid_schema(format!(
                    "invalid field name {:?} on {:?}",
                    field.name, self.name
                )));
            }
            if fields.contains_key(&field.name) {
                return Err(Error::invalid_schema(format!(
                    "duplicate field {:?} on {:?}",
                    field.name, self.name
                )));
            }
            fields.insert(field.name.clone(), field);
        }

        Ok(Table {
            name: self.name,
            fields,
            resolvers: self.resolvers.into_iter().collect(),
            indexes: RwLock::new(vec![]),
        })
    }
}

fn is_identifier(name: &str) -> bool {
    FieldPath::parse(name).is_some_and(|path| path.is_column())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts() -> Table {
        Table::builder("Posts")
            .field(Field::new("title", Type::String))
            .field(Field::new("meta", Type::Json))
            .build()
            .unwrap()
    }

    #[test]
    fn id_is_first() {
        let table = posts();
        let names = table.fields().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["_id", "title", "meta"]);
        assert_eq!(table.field("_id").unwrap().ty, Type::Id);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = Table::builder("Posts")
            .field(Field::new("a", Type::String))
            .field(Field::new("a", Type::Int))
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn indexes_are_registered_once() {
        let table = posts();
        let first = table
            .add_index(vec![IndexKey::asc("title")], &IndexOptions::new())
            .unwrap();
        let second = table
            .add_index(vec![IndexKey::asc("title")], &IndexOptions::new())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.indexes().len(), 1);
        assert!(table
            .get_index(&[IndexKey::asc("title")], &IndexOptions::new())
            .is_some());
    }

    #[test]
    fn index_keys_must_exist() {
        let table = posts();
        assert!(table
            .add_index(vec![IndexKey::asc("missing")], &IndexOptions::new())
            .unwrap_err()
            .is_unrecognized_field());
        assert!(table
            .add_index(vec![IndexKey::asc("title.x")], &IndexOptions::new())
            .is_err());
        assert!(table
            .add_index(vec![IndexKey::asc("meta.x")], &IndexOptions::new())
            .is_ok());
    }
}

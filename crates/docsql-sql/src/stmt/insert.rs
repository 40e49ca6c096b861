use crate::{
    compiler::Compiler,
    query::{inline, Arg, Atom, Compiled, Query},
    random_id,
    scope::Scope,
    serializer::{Comma, Ident},
};

use docsql_core::{
    schema::Table,
    stmt::{Document, IntoSelector, Modifier, Selector, Value},
    Error, Result,
};
use indexmap::IndexSet;

/// Length of generated document ids.
pub const ID_LENGTH: usize = 17;

/// An `INSERT`, optionally resolving conflicts.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    query: Query,
    upsert: bool,
}

/// What happens when an inserted row conflicts with an existing one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    /// Fail the statement
    #[default]
    Error,

    /// Skip conflicting rows
    Ignore,

    /// Overwrite the conflicting row's columns, keyed by `_id`
    Upsert,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InsertOptions {
    pub conflict_strategy: ConflictStrategy,

    /// `RETURNING *` instead of `RETURNING "_id"`
    pub return_inserted: bool,
}

const RETURNING_ACTION: &str =
    "CASE WHEN xmax::TEXT::INTEGER > 0 THEN 'updated' ELSE 'inserted' END AS \"action\"";

impl InsertQuery {
    pub fn new(table: &Table, document: &Document, options: InsertOptions) -> Result<InsertQuery> {
        InsertQuery::many(table, std::slice::from_ref(document), options)
    }

    /// Inserts several rows with one statement.
    pub fn many(table: &Table, documents: &[Document], options: InsertOptions) -> Result<InsertQuery> {
        if documents.is_empty() {
            return Err(Error::invalid_statement("nothing to insert"));
        }

        let rows = documents.iter().cloned().map(with_id).collect::<Vec<_>>();
        let columns = columns(table, &rows)?;

        let mut query = Query::new();
        values(table, &columns, &rows, &mut query);

        match options.conflict_strategy {
            ConflictStrategy::Error => {}
            ConflictStrategy::Ignore => query.push("ON CONFLICT DO NOTHING"),
            ConflictStrategy::Upsert => {
                let assignments = columns
                    .iter()
                    .filter(|column| **column != "_id")
                    .map(|column| format!("{} = EXCLUDED.{}", Ident(column), Ident(column)))
                    .collect::<Vec<_>>();

                if assignments.is_empty() {
                    query.push("ON CONFLICT ( \"_id\" ) DO NOTHING");
                } else {
                    query.push("ON CONFLICT ( \"_id\" ) DO UPDATE SET");
                    query.push(Comma(&assignments).to_string());
                }
            }
        }

        if options.return_inserted {
            query.push("RETURNING *");
        } else if options.conflict_strategy == ConflictStrategy::Upsert {
            query.push(format!("RETURNING \"_id\" , {RETURNING_ACTION}"));
        } else {
            query.push("RETURNING \"_id\"");
        }

        Ok(InsertQuery {
            upsert: options.conflict_strategy == ConflictStrategy::Upsert,
            query,
        })
    }

    /// Inserts the row described by `selector` and `modifier`, or updates the
    /// row that conflicts with it on the selector's fields.
    ///
    /// The row is `$set`, the plain fields, `$setOnInsert`, `$unset` (as
    /// nulls), `$inc` and finally the selector's equality fields. Each row
    /// returned carries an `action` of `inserted` or `updated`.
    pub fn upsert(table: &Table, selector: impl IntoSelector, modifier: &Modifier) -> Result<InsertQuery> {
        let selector = selector.into_selector()?;
        let operation = format!("upsert on {:?}", table.name());

        if !modifier.push.is_empty() || !modifier.add_to_set.is_empty() {
            return Err(Error::not_implemented("$push and $addToSet in upserts"));
        }

        let conflict = conflict_fields(&selector)?;

        let mut row = Document::new();
        row.extend(modifier.set.clone());
        row.extend(modifier.fields.clone());
        row.extend(modifier.set_on_insert.clone());
        for field in &modifier.unset {
            row.insert(field.clone(), Value::Null);
        }
        row.extend(modifier.inc.clone());
        for (field, value) in selector.equality_fields() {
            row.insert(field, value.clone());
        }

        if let Some(field) = row.keys().find(|field| field.contains('.')) {
            return Err(Error::not_implemented(format!(
                "upserting the path {field:?}"
            )));
        }

        let rows = [with_id(row)];
        let columns = columns(table, &rows)?;

        let mut query = Query::new();
        values(table, &columns, &rows, &mut query);

        query.push("ON CONFLICT (");
        query.push(Comma(conflict.iter().map(Ident)).to_string());
        query.push(")");

        if let Some(predicate) = partial_index_predicate(table, &conflict, &operation)? {
            query.push("WHERE");
            query.extend(predicate);
        }

        let updated = modifier
            .set
            .keys()
            .chain(modifier.fields.keys())
            .chain(modifier.unset.iter().map(String::as_str))
            .filter(|field| *field != "_id" && !conflict.iter().any(|name| name == field))
            .collect::<IndexSet<_>>();

        let mut assignments = updated
            .into_iter()
            .map(|field| format!("{} = EXCLUDED.{}", Ident(field), Ident(field)))
            .collect::<Vec<_>>();

        for field in modifier.inc.keys() {
            assignments.push(format!(
                "{field} = COALESCE( {table}.{field} , 0 ) + EXCLUDED.{field}",
                field = Ident(field),
                table = Ident(table.name()),
            ));
        }

        // DO UPDATE is needed even without changes so RETURNING sees the row
        if assignments.is_empty() {
            if let Some(field) = conflict.first() {
                assignments.push(format!("{} = EXCLUDED.{}", Ident(field), Ident(field)));
            }
        }

        query.push("DO UPDATE SET");
        query.push(Comma(&assignments).to_string());
        query.push(format!("RETURNING \"_id\" , {RETURNING_ACTION}"));

        Ok(InsertQuery {
            query,
            upsert: true,
        })
    }

    /// Whether rows come back with an `action` column.
    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

fn with_id(mut row: Document) -> Document {
    if row.get("_id").map_or(true, Value::is_null) {
        row.insert("_id", random_id(ID_LENGTH));
    }
    row
}

/// Columns present in any row, in table order.
fn columns<'a>(table: &'a Table, rows: &[Document]) -> Result<Vec<&'a str>> {
    for row in rows {
        if let Some(field) = row.keys().find(|field| !table.has_field(field)) {
            return Err(Error::unrecognized_field(
                field,
                format!("InsertQuery on {:?}", table.name()),
            ));
        }
    }

    Ok(table
        .fields()
        .map(|field| field.name.as_str())
        .filter(|name| rows.iter().any(|row| row.contains_key(name)))
        .collect())
}

/// `INSERT INTO "T" ( .. ) VALUES ( .. ) , ( .. )`
fn values(table: &Table, columns: &[&str], rows: &[Document], query: &mut Query) {
    query.push("INSERT INTO");
    query.push(Atom::Table(table.name().to_string()));
    query.push("(");
    query.push(Comma(columns.iter().map(Ident)).to_string());
    query.push(")");
    query.push("VALUES");

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            query.push(",");
        }
        query.push("(");
        for (j, column) in columns.iter().enumerate() {
            if j > 0 {
                query.push(",");
            }
            match row.get(column) {
                Some(value) => query.push(Arg::new(value.clone())),
                None => query.push("DEFAULT"),
            }
        }
        query.push(")");
    }
}

/// The top-level fields an upsert conflicts on.
fn conflict_fields(selector: &Selector) -> Result<Vec<String>> {
    let fields = selector.equality_fields();
    if fields.is_empty() || fields.len() != selector.clauses.len() {
        return Err(Error::not_implemented(
            "upserts with selectors other than top-level equality",
        ));
    }
    Ok(fields.into_iter().map(|(field, _)| field.to_string()).collect())
}

/// The predicate of the partial unique index an upsert conflicts on, so
/// PostgreSQL can pick that index as the arbiter.
fn partial_index_predicate(table: &Table, conflict: &[String], operation: &str) -> Result<Option<Vec<Atom>>> {
    let index = table.indexes().into_iter().find(|index| {
        index.unique
            && index.keys.len() == conflict.len()
            && index.keys.iter().all(|key| conflict.contains(&key.field))
    });

    let Some(filter) = index.and_then(|index| index.partial_filter.clone()) else {
        return Ok(None);
    };

    let scope = Scope::table(table, "InsertQuery").renamed(operation);
    let mut atoms = vec![];
    Compiler::new(&scope).selector(&Selector::parse(&filter)?, &mut atoms)?;
    Ok(Some(inline(atoms)))
}

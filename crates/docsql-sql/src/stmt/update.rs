use crate::{
    compiler::Compiler,
    query::{Arg, Atom, Compiled, Query},
    scope::{Scope, Target},
};

use docsql_core::{
    schema::{Table, Type},
    stmt::{IntoSelector, Modifier, Selector, UpdateOptions, Value},
    Error, Result,
};
use indexmap::IndexMap;

/// An `UPDATE` applying a [`Modifier`].
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    query: Query,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateQueryOptions {
    /// Update at most this many rows, locking them first.
    pub limit: Option<u64>,

    /// `RETURNING *` instead of `RETURNING "_id"`
    pub return_updated: bool,
}

/// Per column, the expression it is assigned. Several operators may write
/// below the same JSON column; each wraps the expression built so far.
#[derive(Debug, Default)]
struct Assignments {
    columns: IndexMap<String, Vec<Atom>>,
}

impl UpdateQuery {
    pub fn new(
        table: &Table,
        selector: impl IntoSelector,
        modifier: &Modifier,
        options: &UpdateOptions,
        update: UpdateQueryOptions,
    ) -> Result<UpdateQuery> {
        if options.upsert {
            return Err(Error::invalid_statement(
                "To create an upserting update use an InsertQuery with conflict strategy upsert",
            ));
        }

        if let Some(field) = modifier.fields.keys().next() {
            return Err(Error::not_implemented(format!(
                "replacing field {field:?} without an update operator"
            )));
        }

        let selector = selector.into_selector()?;
        let scope = Scope::table(table, "UpdateQuery");
        let mut assignments = Assignments::default();

        for (field, value) in modifier.set.iter() {
            let target = scope.target(field)?;
            assignments.set(&target, value);
        }

        for field in &modifier.unset {
            let target = scope.target(field)?;
            assignments.unset(&target);
        }

        for (field, by) in modifier.inc.iter() {
            let target = scope.target(field)?;
            assignments.inc(&scope, field, &target, by)?;
        }

        for (field, value) in modifier.push.iter() {
            let target = scope.target(field)?;
            assignments.push(&scope, field, &target, value)?;
        }

        for (field, value) in modifier.add_to_set.iter() {
            let target = scope.target(field)?;
            assignments.add_to_set(field, &target, value)?;
        }

        if assignments.columns.is_empty() {
            return Err(Error::invalid_statement("update has no operations"));
        }

        let mut query = Query::unnamed();
        query.push("UPDATE");
        query.push(Atom::Table(table.name().to_string()));
        query.push("SET");

        for (i, (column, expr)) in assignments.columns.into_iter().enumerate() {
            if i > 0 {
                query.push(",");
            }
            query.push(format!("{column} ="));
            query.extend(expr);
        }

        filter(table, &scope, &selector, update.limit, &mut query)?;

        query.push(if update.return_updated {
            "RETURNING *"
        } else {
            "RETURNING \"_id\""
        });

        Ok(UpdateQuery { query })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }
}

/// Appends the `WHERE` clause of an update or delete. With a limit, rows are
/// picked by a locked subselect since PostgreSQL has no `UPDATE .. LIMIT`.
pub(super) fn filter(
    table: &Table,
    scope: &Scope,
    selector: &Selector,
    limit: Option<u64>,
    query: &mut Query,
) -> Result<()> {
    let compiler = Compiler::new(scope);

    let Some(limit) = limit else {
        if !selector.is_empty() {
            let mut atoms = vec![Atom::raw("WHERE")];
            compiler.selector(selector, &mut atoms)?;
            query.extend(atoms);
        }
        return Ok(());
    };

    let mut ids = Query::new();
    ids.push("SELECT \"_id\" FROM");
    ids.push(Atom::Table(table.name().to_string()));

    if !selector.is_empty() {
        let mut atoms = vec![Atom::raw("WHERE")];
        compiler.selector(selector, &mut atoms)?;
        ids.extend(atoms);
    }

    ids.push("LIMIT");
    ids.push(Arg::new(limit));
    ids.push("FOR UPDATE");

    query.push("WHERE \"_id\" IN");
    query.push(ids);
    Ok(())
}

impl Assignments {
    /// The expression currently assigned to `column`, initially the column
    /// itself.
    fn current(&mut self, column: &str) -> Vec<Atom> {
        self.columns
            .get(column)
            .cloned()
            .unwrap_or_else(|| vec![Atom::raw(column)])
    }

    fn assign(&mut self, column: &str, expr: Vec<Atom>) {
        self.columns.insert(column.to_string(), expr);
    }

    /// `JSONB_SET( <current> , '{d, e}'::TEXT[] , <value> , TRUE )`
    fn jsonb_set(&mut self, target: &Target, path: &str, value: Vec<Atom>) {
        let mut expr = vec![Atom::raw("JSONB_SET(")];
        expr.extend(self.current(&target.column));
        expr.push(Atom::raw(","));
        expr.push(Atom::Raw(format!("{path}::TEXT[]")));
        expr.push(Atom::raw(","));
        expr.extend(value);
        expr.push(Atom::raw(","));
        expr.push(Atom::raw("TRUE"));
        expr.push(Atom::raw(")"));
        self.assign(&target.column, expr);
    }

    fn set(&mut self, target: &Target, value: &Value) {
        match &target.path {
            None => self.assign(&target.column, vec![Atom::Arg(Arg::new(value.clone()))]),
            Some(path) => {
                let value = match value {
                    // JSONB_SET with an SQL NULL would null the whole column
                    Value::Null => Atom::raw("'null'::JSONB"),
                    value => Atom::Arg(Arg::new(value.clone())),
                };
                self.jsonb_set(target, &path.steps_literal(), vec![value]);
            }
        }
    }

    fn unset(&mut self, target: &Target) {
        match &target.path {
            None => self.assign(&target.column, vec![Atom::raw("NULL")]),
            Some(path) => {
                let mut expr = vec![Atom::raw("(")];
                expr.extend(self.current(&target.column));
                expr.push(Atom::raw("#-"));
                expr.push(Atom::Raw(format!("{}::TEXT[]", path.steps_literal())));
                expr.push(Atom::raw(")"));
                self.assign(&target.column, expr);
            }
        }
    }

    fn inc(&mut self, scope: &Scope, field: &str, target: &Target, by: &Value) -> Result<()> {
        if by.as_f64().is_none() {
            return Err(Error::invalid_statement(format!(
                "$inc on {field:?} expects a number, got {}",
                by.kind_name()
            )));
        }

        match &target.path {
            None => {
                let mut expr = vec![Atom::raw("COALESCE(")];
                expr.extend(self.current(&target.column));
                expr.extend([
                    Atom::raw(","),
                    Atom::raw("0"),
                    Atom::raw(")"),
                    Atom::raw("+"),
                    Atom::Arg(Arg::new(by.clone())),
                ]);
                self.assign(&target.column, expr);
            }
            Some(path) => {
                let current = scope.resolve(field, Some("DOUBLE PRECISION"))?;
                let value = vec![
                    Atom::raw("TO_JSONB("),
                    Atom::raw("COALESCE("),
                    Atom::Raw(current.sql),
                    Atom::raw(","),
                    Atom::raw("0"),
                    Atom::raw(")"),
                    Atom::raw("+"),
                    Atom::Arg(Arg::typed(by.clone(), "DOUBLE PRECISION")),
                    Atom::raw(")"),
                ];
                self.jsonb_set(target, &path.steps_literal(), value);
            }
        }
        Ok(())
    }

    fn push(&mut self, scope: &Scope, field: &str, target: &Target, value: &Value) -> Result<()> {
        let appended = Atom::Arg(Arg::typed(Value::Array(vec![value.clone()]), "JSONB"));

        match (&target.ty, &target.path) {
            (Some(Type::Array(_)), None) => {
                let mut expr = vec![Atom::raw("ARRAY_APPEND(")];
                expr.extend(self.current(&target.column));
                expr.push(Atom::raw(","));
                expr.push(Atom::Arg(Arg::new(value.clone())));
                expr.push(Atom::raw(")"));
                self.assign(&target.column, expr);
            }
            (Some(Type::Json) | None, None) => {
                let mut expr = vec![Atom::raw("COALESCE(")];
                expr.extend(self.current(&target.column));
                expr.extend([
                    Atom::raw(","),
                    Atom::raw("'[]'::JSONB"),
                    Atom::raw(")"),
                    Atom::raw("||"),
                    appended,
                ]);
                self.assign(&target.column, expr);
            }
            (_, Some(path)) => {
                let current = scope.resolve(field, None)?;
                let value = vec![
                    Atom::raw("COALESCE("),
                    Atom::Raw(current.sql),
                    Atom::raw(","),
                    Atom::raw("'[]'::JSONB"),
                    Atom::raw(")"),
                    Atom::raw("||"),
                    appended,
                ];
                self.jsonb_set(target, &path.steps_literal(), value);
            }
            (Some(_), None) => {
                return Err(Error::invalid_statement(format!(
                    "$push on non-array field {field:?}"
                )))
            }
        }
        Ok(())
    }

    fn add_to_set(&mut self, field: &str, target: &Target, value: &Value) -> Result<()> {
        match (&target.ty, &target.path) {
            (Some(Type::Array(_)), None) => {
                let current = self.current(&target.column);
                let mut expr = vec![
                    Atom::raw("CASE WHEN"),
                    Atom::Arg(Arg::new(value.clone())),
                    Atom::raw("= ANY("),
                ];
                expr.extend(current.iter().cloned());
                expr.push(Atom::raw(")"));
                expr.push(Atom::raw("THEN"));
                expr.extend(current.iter().cloned());
                expr.push(Atom::raw("ELSE"));
                expr.push(Atom::raw("ARRAY_APPEND("));
                expr.extend(current);
                expr.push(Atom::raw(","));
                expr.push(Atom::Arg(Arg::new(value.clone())));
                expr.push(Atom::raw(")"));
                expr.push(Atom::raw("END"));
                self.assign(&target.column, expr);
            }
            (Some(Type::Json) | None, path) => {
                let path = path
                    .as_ref()
                    .map_or_else(|| "'{}'".to_string(), |path| path.steps_literal());
                let mut expr = vec![Atom::raw("fm_add_to_set(")];
                expr.extend(self.current(&target.column));
                expr.extend([
                    Atom::raw(","),
                    Atom::Raw(format!("{path}::TEXT[]")),
                    Atom::raw(","),
                    Atom::Arg(Arg::typed(value.clone(), "JSONB")),
                    Atom::raw(")"),
                ]);
                self.assign(&target.column, expr);
            }
            (Some(_), _) => {
                return Err(Error::invalid_statement(format!(
                    "$addToSet on non-array field {field:?}"
                )))
            }
        }
        Ok(())
    }
}

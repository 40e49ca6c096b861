use crate::{
    compiler::Compiler,
    query::{Arg, Atom, Compiled, Query},
    scope::Scope,
    serializer::{Comma, Ident},
};

use docsql_core::{
    schema::{Schema, Table, Type},
    stmt::{
        AddFields, Expr, FindOptions, Group, GroupItem, IntoSelector, Lookup, Projection,
        ProjectionItem, Selector, Sort,
    },
    Error, Result,
};
use std::sync::Arc;

/// A `SELECT` over a table or over another select.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    query: Query,

    /// Fields of the rows this query produces
    output: Scope,
}

/// What a [`SelectQuery`] reads from.
#[derive(Debug, Clone)]
pub enum Source {
    Table(Arc<Table>),
    Subquery(Box<SelectQuery>),
}

/// Select features beyond [`FindOptions`].
#[derive(Debug, Default, Clone)]
pub struct SelectOptions {
    /// Select `count(*)` instead of rows.
    pub count: bool,

    pub lookup: Option<Lookup>,

    /// Computed fields appended to the select list.
    pub add_fields: AddFields,

    pub group: Option<Group>,

    /// Raw SQL placed right after the `FROM` clause, usually a `JOIN`.
    pub join_hook: Option<String>,

    pub for_update: bool,

    /// Resolves `$lookup` collection names.
    pub schema: Option<Arc<Schema>>,
}

/// Everything a select is built from, already parsed.
#[derive(Debug, Default, Clone)]
pub(crate) struct SelectParts {
    pub(crate) selector: Selector,
    pub(crate) projection: Projection,
    pub(crate) sort: Sort,
    pub(crate) limit: Option<u64>,
    pub(crate) skip: Option<u64>,
    pub(crate) options: SelectOptions,
}

impl SelectQuery {
    pub fn new(
        source: impl Into<Source>,
        selector: impl IntoSelector,
        options: &FindOptions,
        select: SelectOptions,
    ) -> Result<SelectQuery> {
        if options.collation.is_some() {
            return Err(Error::not_implemented("collation"));
        }

        let parts = SelectParts {
            selector: selector.into_selector()?,
            projection: options
                .projection
                .as_ref()
                .map(Projection::parse)
                .transpose()?
                .unwrap_or_default(),
            sort: options
                .sort
                .as_ref()
                .map(Sort::parse)
                .transpose()?
                .unwrap_or_default(),
            limit: options.limit,
            skip: options.skip,
            options: select,
        };

        SelectQuery::build(source.into(), parts)
    }

    pub(crate) fn build(source: Source, parts: SelectParts) -> Result<SelectQuery> {
        let SelectParts {
            selector,
            projection,
            sort,
            limit,
            skip,
            options,
        } = parts;

        // Count the rows of the limited select, not the whole table
        if options.count && (limit.is_some() || skip.is_some()) {
            let inner = SelectQuery::build(
                source,
                SelectParts {
                    selector,
                    limit,
                    skip,
                    options: SelectOptions {
                        count: false,
                        ..options
                    },
                    ..SelectParts::default()
                },
            )?;

            return SelectQuery::build(
                Source::Subquery(Box::new(inner)),
                SelectParts {
                    options: SelectOptions {
                        count: true,
                        ..SelectOptions::default()
                    },
                    ..SelectParts::default()
                },
            );
        }

        let (mut scope, from, table) = match source {
            Source::Table(table) => (
                Scope::table(&table, "SelectQuery"),
                Atom::Table(table.name().to_string()),
                Some(table),
            ),
            Source::Subquery(subquery) => {
                let SelectQuery { query, output } = *subquery;
                (
                    output.renamed("SelectQuery on a subquery"),
                    Atom::from(query),
                    None,
                )
            }
        };

        let lookup = match (&options.lookup, &table) {
            (Some(lookup), Some(table)) => Some(lateral_lookup(
                table,
                lookup,
                &mut scope,
                options.schema.as_deref(),
            )?),
            (Some(_), None) => return Err(Error::not_implemented("$lookup on a derived query")),
            (None, _) => None,
        };

        let compiler = Compiler::new(&scope);
        let mut atoms = vec![Atom::raw("SELECT")];
        let mut output = Scope::derived(scope.operation());

        if options.count {
            atoms.push(Atom::raw("count(*)"));
            output.add("count", Some(Type::BigInt));
        } else if let Some(group) = &options.group {
            for (i, (name, item)) in group.items.iter().enumerate() {
                if i > 0 {
                    atoms.push(Atom::raw(","));
                }
                match item {
                    GroupItem::Key(expr) => {
                        compiler.output(expr, &mut atoms)?;
                        output.add(name, compiler.expr_type(expr));
                    }
                    GroupItem::Aggregate(aggregate) => {
                        compiler.aggregate(aggregate, &mut atoms)?;
                        output.add(name, None);
                    }
                }
                atoms.push(Atom::Raw(format!("AS {}", Ident(name))));
            }
        } else {
            let columns = projected_columns(&scope, &projection)?;
            match &columns {
                Some(columns) => {
                    let list = columns.iter().map(|name| scope.column(name));
                    atoms.push(Atom::Raw(Comma(list).to_string()));
                    for name in columns {
                        output.add(*name, scope.field_type(name).cloned());
                    }
                }
                None => {
                    atoms.push(Atom::Raw(match &table {
                        Some(table) if lookup.is_none() => format!("{}.*", Ident(table.name())),
                        _ => "*".to_string(),
                    }));
                    for name in scope.names() {
                        output.add(name, scope.field_type(name).cloned());
                    }
                }
            }

            let computed = options
                .add_fields
                .fields
                .iter()
                .map(|(name, expr)| (name.as_str(), expr))
                .chain(projection.computed());

            for (name, expr) in computed {
                atoms.push(Atom::raw(","));
                compiler.output(expr, &mut atoms)?;
                atoms.push(Atom::Raw(format!("AS {}", Ident(name))));
                output.add(name, compiler.expr_type(expr));
            }
        }

        atoms.push(Atom::raw("FROM"));
        atoms.push(from);

        if let Some(lookup) = lookup {
            atoms.push(Atom::raw(","));
            atoms.push(Atom::Raw(lookup));
        }

        if let Some(join) = &options.join_hook {
            atoms.push(Atom::Raw(join.clone()));
        }

        if !selector.is_empty() {
            atoms.push(Atom::raw("WHERE"));
            compiler.selector(&selector, &mut atoms)?;
        }

        if let Some(group) = &options.group {
            let keys = group
                .keys()
                .filter(|(_, expr)| !matches!(expr, Expr::Literal(_)))
                .collect::<Vec<_>>();

            if !keys.is_empty() {
                atoms.push(Atom::raw("GROUP BY"));
                for (i, (_, expr)) in keys.into_iter().enumerate() {
                    if i > 0 {
                        atoms.push(Atom::raw(","));
                    }
                    compiler.expr(expr, &mut atoms)?;
                }
            }
        }

        if !sort.is_empty() && !options.count {
            let mut order = Vec::with_capacity(sort.fields.len());
            for (name, direction) in &sort.fields {
                let sql = match scope.resolve(name, None) {
                    Ok(resolved) => resolved.sql,
                    Err(_) if output.contains(name) => Ident(name).to_string(),
                    Err(err) => return Err(err),
                };
                order.push(format!("{sql} {}", direction.as_sql()));
            }
            atoms.push(Atom::raw("ORDER BY"));
            atoms.push(Atom::Raw(Comma(&order).to_string()));
        }

        if let Some(limit) = limit {
            atoms.push(Atom::raw("LIMIT"));
            atoms.push(Atom::Arg(Arg::new(limit)));
        }

        if let Some(skip) = skip {
            atoms.push(Atom::raw("OFFSET"));
            atoms.push(Atom::Arg(Arg::new(skip)));
        }

        if options.for_update {
            atoms.push(Atom::raw("FOR UPDATE"));
        }

        let mut query = Query::new();
        query.extend(atoms);
        Ok(SelectQuery { query, output })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile()
    }

    /// Names of the fields each returned row carries.
    pub fn output_fields(&self) -> impl Iterator<Item = &str> {
        self.output.names()
    }
}

/// The explicit column list of a projection, or `None` to select all.
fn projected_columns<'a>(scope: &'a Scope, projection: &'a Projection) -> Result<Option<Vec<&'a str>>> {
    if projection.is_inclusion() {
        let mut names = vec![];
        for (name, item) in &projection.items {
            if let ProjectionItem::Include = item {
                if !scope.contains(name) {
                    return Err(scope.unrecognized(name));
                }
                names.push(name.as_str());
            }
        }

        if !names.contains(&"_id") && !projection.excludes("_id") && scope.contains("_id") {
            names.push("_id");
        }
        return Ok(Some(names));
    }

    let mut excludes = false;
    for (name, item) in &projection.items {
        if let ProjectionItem::Exclude = item {
            if !scope.contains(name) {
                return Err(scope.unrecognized(name));
            }
            excludes = true;
        }
    }

    if !excludes {
        return Ok(None);
    }

    let names = scope
        .names()
        .filter(|name| !projection.excludes(name))
        .collect::<Vec<_>>();

    if names.is_empty() {
        return Err(Error::invalid_statement("projection excludes every field"));
    }
    Ok(Some(names))
}

/// `LATERAL (SELECT jsonb_agg(..) ..) Q`, which adds the looked-up rows as
/// one JSON array field.
fn lateral_lookup(
    table: &Table,
    lookup: &Lookup,
    scope: &mut Scope,
    schema: Option<&Schema>,
) -> Result<String> {
    if !scope.contains(&lookup.local_field) {
        return Err(scope.unrecognized(&lookup.local_field));
    }

    let from = match schema.and_then(|schema| schema.collection(&lookup.from)) {
        Some(foreign) if !foreign.has_field(&lookup.foreign_field) => {
            return Err(Error::unrecognized_field(
                &lookup.foreign_field,
                format!("$lookup on {:?}", foreign.name()),
            ))
        }
        Some(foreign) => foreign.name().to_string(),
        None => lookup.from.clone(),
    };

    scope.add(&lookup.as_field, Some(Type::Json));

    let from = Ident(&from);
    Ok(format!(
        "LATERAL (SELECT jsonb_agg({from}.*) AS {} FROM {from} WHERE {}.{} = {from}.{}) Q",
        Ident(&lookup.as_field),
        Ident(table.name()),
        Ident(&lookup.local_field),
        Ident(&lookup.foreign_field),
    ))
}

impl From<Arc<Table>> for Source {
    fn from(value: Arc<Table>) -> Source {
        Source::Table(value)
    }
}

impl From<&Arc<Table>> for Source {
    fn from(value: &Arc<Table>) -> Source {
        Source::Table(value.clone())
    }
}

impl From<SelectQuery> for Source {
    fn from(value: SelectQuery) -> Source {
        Source::Subquery(Box::new(value))
    }
}

impl SelectOptions {
    pub fn new() -> SelectOptions {
        SelectOptions::default()
    }

    pub fn count(mut self, count: bool) -> SelectOptions {
        self.count = count;
        self
    }

    pub fn lookup(mut self, lookup: Lookup) -> SelectOptions {
        self.lookup = Some(lookup);
        self
    }

    pub fn add_fields(mut self, add_fields: AddFields) -> SelectOptions {
        self.add_fields = add_fields;
        self
    }

    pub fn group(mut self, group: Group) -> SelectOptions {
        self.group = Some(group);
        self
    }

    pub fn join_hook(mut self, sql: impl Into<String>) -> SelectOptions {
        self.join_hook = Some(sql.into());
        self
    }

    pub fn for_update(mut self, for_update: bool) -> SelectOptions {
        self.for_update = for_update;
        self
    }

    pub fn schema(mut self, schema: Arc<Schema>) -> SelectOptions {
        self.schema = Some(schema);
        self
    }
}

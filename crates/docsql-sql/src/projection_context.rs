use crate::{
    compiler::Compiler,
    query::{Atom, Compiled, Query},
    random_id,
    scope::Scope,
    serializer::Ident,
};

use docsql_core::{
    schema::{CodeResolverFn, JoinAlias, JoinBase, JoinKind, SqlResolverContext, Table},
    stmt::{Document, IntoSelector, Value},
    Result,
};
use indexmap::IndexMap;
use std::fmt;

const CURRENT_USER: &str = "currentUser";

/// Length of generated join aliases.
const JOIN_ALIAS_LENGTH: usize = 5;

/// Builds one projected `SELECT` whose fields may come from resolvers.
///
/// Resolvers add joins and arguments while the select list is assembled.
/// The context lives for one query: [`ProjectionContext::compile_query`]
/// consumes it.
pub struct ProjectionContext<'a> {
    table: &'a Table,

    /// Alias of the primary table
    prefix: String,

    /// Select list entries keyed by output name
    projections: IndexMap<String, String>,

    joins: Vec<(JoinBase, JoinAlias)>,

    args: Vec<Value>,

    code_resolvers: Vec<(String, CodeResolverFn)>,

    users_table: String,

    /// Index into `args` of the current user's id, once joined
    current_user: Option<usize>,
}

/// The output of a [`ProjectionContext`].
#[derive(Clone)]
pub struct ProjectedQuery {
    query: Query,

    /// Arguments bound while resolving projections; the query's own
    /// placeholders follow them.
    args: Vec<Value>,

    code_resolvers: Vec<(String, CodeResolverFn)>,
}

impl<'a> ProjectionContext<'a> {
    pub fn new(table: &'a Table) -> ProjectionContext<'a> {
        let prefix = table
            .name()
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase().to_string())
            .unwrap_or_else(|| "t".to_string());

        ProjectionContext {
            table,
            prefix,
            projections: IndexMap::new(),
            joins: vec![],
            args: vec![],
            code_resolvers: vec![],
            users_table: "Users".to_string(),
            current_user: None,
        }
    }

    /// The table `current_user_field` reads from. Defaults to `Users`.
    pub fn with_users_table(mut self, name: impl Into<String>) -> ProjectionContext<'a> {
        self.users_table = name.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a select list entry: the primary table's column when `expr` is
    /// `None`, otherwise `<expr> AS "name"`. Re-adding a name replaces it.
    pub fn add_projection(&mut self, name: &str, expr: Option<&str>) {
        let sql = match expr {
            None => format!("{}.{}", self.prefix, Ident(name)),
            Some(expr) => {
                let expr = expr.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("{expr} AS {}", Ident(name))
            }
        };
        self.projections.insert(name.to_string(), sql);
    }

    /// Adds a join, or returns the alias of an identical one.
    pub fn add_join(&mut self, join: JoinBase) -> JoinAlias {
        if let Some((_, alias)) = self.joins.iter().find(|(existing, _)| *existing == join) {
            return alias.clone();
        }

        let alias = loop {
            let candidate = random_id(JOIN_ALIAS_LENGTH);
            if candidate != self.prefix
                && candidate != CURRENT_USER
                && self.joins.iter().all(|(_, alias)| alias.prefix() != candidate)
            {
                break JoinAlias::new(candidate);
            }
        };

        self.joins.push((join, alias.clone()));
        alias
    }

    /// Binds an argument and returns its placeholder.
    pub fn add_arg(&mut self, value: impl Into<Value>) -> String {
        self.args.push(value.into());
        format!("${}", self.args.len())
    }

    /// Computes `name` from each fetched row.
    pub fn add_code_resolver(&mut self, name: impl Into<String>, resolver: CodeResolverFn) {
        self.code_resolvers.push((name.into(), resolver));
    }

    /// Joins the current user's row so `current_user_field` can read it.
    /// With `None` the join matches nothing and those fields are `NULL`.
    pub fn set_current_user(&mut self, user_id: Option<&str>) {
        let user_id = Value::from(user_id);

        if let Some(index) = self.current_user {
            self.args[index] = user_id;
            return;
        }

        let placeholder = self.add_arg(user_id);
        self.current_user = Some(self.args.len() - 1);
        self.joins.push((
            JoinBase::new(&self.users_table, JoinKind::Left).on("_id", placeholder),
            JoinAlias::new(CURRENT_USER),
        ));
    }

    /// Projects `fields`, each through the table's resolver when it has one
    /// and as the plain column otherwise.
    pub fn project(&mut self, fields: &[&str]) -> Result<()> {
        let table = self.table;

        for &field in fields {
            let resolver = table.resolver(field);
            let name = resolver
                .and_then(|resolver| resolver.field_name.as_deref())
                .unwrap_or(field);

            match resolver {
                Some(resolver) if resolver.sql.is_some() || resolver.code.is_some() => {
                    if let Some(sql) = &resolver.sql {
                        let expr = sql(&mut *self)?;
                        self.add_projection(name, Some(&expr));
                    } else if let Some(code) = &resolver.code {
                        self.add_code_resolver(name, code.clone());
                    }
                }
                _ if table.has_field(field) => self.add_projection(field, None),
                _ => return Err(self.scope().unrecognized(field)),
            }
        }
        Ok(())
    }

    fn scope(&self) -> Scope {
        Scope::table(self.table, "ProjectionContext").qualified(&self.prefix)
    }

    /// `SELECT <projections> FROM "T" t <joins> [WHERE ..]`, where fields of
    /// the selector are read from the primary table.
    pub fn compile_query(self, selector: impl IntoSelector) -> Result<ProjectedQuery> {
        let selector = selector.into_selector()?;
        let scope = self.scope();

        let projections = if self.projections.is_empty() {
            format!("{}.*", self.prefix)
        } else {
            self.projections.values().cloned().collect::<Vec<_>>().join(", ")
        };

        let mut query = Query::new();
        query.push(format!("SELECT {projections} FROM"));
        query.push(Atom::Table(self.table.name().to_string()));
        query.push(self.prefix.clone());

        for (join, alias) in &self.joins {
            query.push(join_sql(join, alias));
        }

        if !selector.is_empty() {
            let mut atoms = vec![Atom::raw("WHERE")];
            Compiler::new(&scope).selector(&selector, &mut atoms)?;
            query.extend(atoms);
        }

        Ok(ProjectedQuery {
            query,
            args: self.args,
            code_resolvers: self.code_resolvers,
        })
    }
}

fn join_sql(join: &JoinBase, alias: &JoinAlias) -> String {
    let on = if join.on.is_empty() {
        "TRUE".to_string()
    } else {
        join.on
            .iter()
            .map(|(column, expr)| format!("{} = {expr}", alias.field(column)))
            .collect::<Vec<_>>()
            .join(" AND ")
    };

    format!(
        "{} JOIN {} {} ON {on}",
        join.kind.as_sql(),
        Ident(&join.table),
        Ident(alias.prefix())
    )
}

impl SqlResolverContext for ProjectionContext<'_> {
    fn field(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, Ident(name))
    }

    fn current_user_field(&self, name: &str) -> String {
        match self.current_user {
            Some(_) => JoinAlias::new(CURRENT_USER).field(name),
            None => "NULL".to_string(),
        }
    }

    fn join(&mut self, join: JoinBase) -> JoinAlias {
        self.add_join(join)
    }

    fn arg(&mut self, value: Value) -> String {
        self.add_arg(value)
    }
}

impl ProjectedQuery {
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn compile(&self) -> Compiled {
        self.query.compile_after(self.args.clone())
    }

    /// Adds the code-resolved fields to fetched rows.
    pub fn resolve_rows(&self, mut rows: Vec<Document>) -> Result<Vec<Document>> {
        if self.code_resolvers.is_empty() {
            return Ok(rows);
        }

        for row in &mut rows {
            for (name, resolver) in &self.code_resolvers {
                let value = resolver(&*row)?;
                row.insert(name.clone(), value);
            }
        }
        Ok(rows)
    }
}

impl fmt::Debug for ProjectionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionContext")
            .field("table", &self.table.name())
            .field("prefix", &self.prefix)
            .field("projections", &self.projections)
            .field("joins", &self.joins)
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Debug for ProjectedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code_resolvers = self
            .code_resolvers
            .iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>();

        f.debug_struct("ProjectedQuery")
            .field("query", &self.query)
            .field("args", &self.args)
            .field("code_resolvers", &code_resolvers)
            .finish()
    }
}

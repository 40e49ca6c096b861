use crate::serializer::Ident;

use docsql_core::{
    schema::{FieldPath, PathStep, Table, Type},
    Error, Result,
};
use indexmap::IndexMap;

/// The fields an expression may reference, with their declared types.
///
/// A field with no type comes from a derived query (a computed projection,
/// a group key) and is treated like a JSON value when a path reaches into
/// it.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    /// Names the statement in errors: `SelectQuery on "Posts"`
    operation: String,

    fields: IndexMap<String, Option<Type>>,

    /// Alias columns are qualified with, as in `t."name"`
    qualifier: Option<String>,
}

/// A field reference compiled to SQL.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub(crate) sql: String,

    /// The declared type of the expression, when there is one. JSON paths
    /// are untyped.
    pub(crate) ty: Option<Type>,
}

/// The column an update writes, plus the JSON path below it.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) column: String,
    pub(crate) ty: Option<Type>,
    pub(crate) path: Option<FieldPath>,
}

impl Scope {
    pub(crate) fn table(table: &Table, kind: &str) -> Scope {
        Scope {
            operation: format!("{kind} on {:?}", table.name()),
            fields: table
                .fields()
                .map(|field| (field.name.clone(), Some(field.ty.clone())))
                .collect(),
            qualifier: None,
        }
    }

    pub(crate) fn derived(operation: impl Into<String>) -> Scope {
        Scope {
            operation: operation.into(),
            fields: IndexMap::new(),
            qualifier: None,
        }
    }

    pub(crate) fn qualified(mut self, qualifier: impl Into<String>) -> Scope {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub(crate) fn renamed(mut self, operation: impl Into<String>) -> Scope {
        self.operation = operation.into();
        self
    }

    pub(crate) fn operation(&self) -> &str {
        &self.operation
    }

    pub(crate) fn add(&mut self, name: impl Into<String>, ty: Option<Type>) {
        self.fields.insert(name.into(), ty);
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub(crate) fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub(crate) fn unrecognized(&self, field: &str) -> Error {
        Error::unrecognized_field(field, &self.operation)
    }

    /// A top-level column, qualified when the scope has an alias.
    pub(crate) fn column(&self, name: &str) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{qualifier}.{}", Ident(name)),
            None => Ident(name).to_string(),
        }
    }

    /// Resolves a possibly dotted field. `hint` is the cast a JSON path gets
    /// so that it compares against a value of that type.
    pub(crate) fn resolve(&self, name: &str, hint: Option<&str>) -> Result<Resolved> {
        if let Some(ty) = self.fields.get(name) {
            let column = self.column(name);
            let sql = match (ty, hint) {
                (Some(Type::Json), Some(hint)) if reads_text(hint) => {
                    format!("({column}#>>'{{}}')::{hint}")
                }
                (Some(Type::Json), Some(hint)) => format!("({column})::{hint}"),
                _ => column,
            };
            return Ok(Resolved {
                sql,
                ty: ty.clone(),
            });
        }

        let path = FieldPath::parse(name).ok_or_else(|| self.unrecognized(name))?;
        let Some(ty) = self.fields.get(&path.column) else {
            return Err(self.unrecognized(name));
        };
        let column = self.column(&path.column);

        match ty {
            Some(Type::Array(element)) => match path.steps[..] {
                [PathStep::Index(index)] => Ok(Resolved {
                    sql: format!("({column}[{}])::{}", index + 1, element.sql_name()),
                    ty: Some((**element).clone()),
                }),
                _ => Err(self.unrecognized(name)),
            },
            Some(Type::Json) | None => Ok(Resolved {
                sql: json_path(&column, &path.steps, hint),
                ty: None,
            }),
            Some(_) => Err(self.unrecognized(name)),
        }
    }

    /// The JSONB value at a field, without any cast: `"c"->'location'`.
    pub(crate) fn resolve_json(&self, name: &str) -> Result<String> {
        if self.contains(name) {
            return Ok(self.column(name));
        }

        let path = FieldPath::parse(name).ok_or_else(|| self.unrecognized(name))?;
        match self.fields.get(&path.column) {
            Some(Some(Type::Json) | None) => {}
            _ => return Err(self.unrecognized(name)),
        }

        let mut sql = self.column(&path.column);
        for step in &path.steps {
            sql.push_str("->");
            sql.push_str(&step_sql(step));
        }
        Ok(sql)
    }

    /// Resolves the column an update assigns to.
    pub(crate) fn target(&self, name: &str) -> Result<Target> {
        if let Some(ty) = self.fields.get(name) {
            return Ok(Target {
                column: Ident(name).to_string(),
                ty: ty.clone(),
                path: None,
            });
        }

        let path = FieldPath::parse(name).ok_or_else(|| self.unrecognized(name))?;
        match self.fields.get(&path.column) {
            Some(ty @ (Some(Type::Json) | None)) => Ok(Target {
                column: Ident(&path.column).to_string(),
                ty: ty.clone(),
                path: Some(path),
            }),
            _ => Err(self.unrecognized(name)),
        }
    }
}

/// Whether a JSON value is read as text before the cast. JSONB casts
/// directly only to numbers and booleans.
fn reads_text(hint: &str) -> bool {
    matches!(hint, "TEXT" | "TIMESTAMPTZ")
}

fn json_path(column: &str, steps: &[PathStep], hint: Option<&str>) -> String {
    let cast = hint.map(|hint| format!("::{hint}")).unwrap_or_default();
    let text = hint.is_some_and(reads_text);

    if let ([PathStep::Index(index)], false) = (steps, text) {
        return format!("({column}[{index}]){cast}");
    }

    let mut sql = format!("({column}");
    for (i, step) in steps.iter().enumerate() {
        let last = i + 1 == steps.len();
        sql.push_str(if last && text { "->>" } else { "->" });
        sql.push_str(&step_sql(step));
    }
    sql.push(')');
    sql.push_str(&cast);
    sql
}

fn step_sql(step: &PathStep) -> String {
    match step {
        PathStep::Key(key) => format!("'{}'", key.replace('\'', "''")),
        PathStep::Index(index) => index.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsql_core::schema::Field;

    fn scope() -> Scope {
        let table = Table::builder("T")
            .field(Field::new("a", Type::Float))
            .field(Field::new("c", Type::Json))
            .field(Field::new("tags", Type::array(Type::String)))
            .build()
            .unwrap();
        Scope::table(&table, "SelectQuery")
    }

    #[test]
    fn json_paths() {
        let scope = scope();
        assert_eq!(
            scope.resolve("c.d.e", Some("INTEGER")).unwrap().sql,
            "(\"c\"->'d'->'e')::INTEGER"
        );
        assert_eq!(
            scope.resolve("c.d.e", Some("TEXT")).unwrap().sql,
            "(\"c\"->'d'->>'e')::TEXT"
        );
        assert_eq!(
            scope.resolve("c.0", Some("INTEGER")).unwrap().sql,
            "(\"c\"[0])::INTEGER"
        );
        assert_eq!(scope.resolve("c.d", None).unwrap().sql, "(\"c\"->'d')");
    }

    #[test]
    fn json_dates_are_read_as_text() {
        let scope = scope();
        assert_eq!(
            scope.resolve("c.when", Some("TIMESTAMPTZ")).unwrap().sql,
            "(\"c\"->>'when')::TIMESTAMPTZ"
        );
        assert_eq!(
            scope.resolve("c.1", Some("TIMESTAMPTZ")).unwrap().sql,
            "(\"c\"->>1)::TIMESTAMPTZ"
        );
        assert_eq!(
            scope.resolve("c", Some("TIMESTAMPTZ")).unwrap().sql,
            "(\"c\"#>>'{}')::TIMESTAMPTZ"
        );
    }

    #[test]
    fn native_array_elements_are_one_based() {
        let resolved = scope().resolve("tags.0", Some("TEXT")).unwrap();
        assert_eq!(resolved.sql, "(\"tags\"[1])::TEXT");
        assert_eq!(resolved.ty, Some(Type::String));
    }

    #[test]
    fn unknown_fields() {
        let scope = scope();
        for name in ["x", "a.b", "c.d'e", "tags.x"] {
            let err = scope.resolve(name, None).unwrap_err();
            assert!(err.is_unrecognized_field(), "{name}");
        }
        assert!(scope
            .resolve("x", None)
            .unwrap_err()
            .to_string()
            .contains("SelectQuery on \"T\""));
    }

    #[test]
    fn qualified_columns() {
        let scope = scope().qualified("t");
        assert_eq!(scope.resolve("a", None).unwrap().sql, "t.\"a\"");
        assert_eq!(scope.resolve_json("c.location").unwrap(), "t.\"c\"->'location'");
    }
}

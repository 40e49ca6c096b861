use std::fmt;

/// Column storage types.
///
/// Each variant maps to exactly one PostgreSQL type, used both in
/// `CREATE TABLE` and as the element type of `ARRAY[..]::<T>[]` casts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Document ids, `VARCHAR(27)`
    Id,
    String,
    Int,
    BigInt,
    Float,
    Bool,
    Date,
    /// Objects and untyped arrays, stored as `JSONB`
    Json,
    /// Native PostgreSQL array of the element type
    Array(Box<Type>),
    /// pgvector embedding with a fixed dimension
    Vector(usize),
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn sql_name(&self) -> String {
        match self {
            Type::Id => "VARCHAR(27)".to_string(),
            Type::String => "TEXT".to_string(),
            Type::Int => "INTEGER".to_string(),
            Type::BigInt => "BIGINT".to_string(),
            Type::Float => "DOUBLE PRECISION".to_string(),
            Type::Bool => "BOOL".to_string(),
            Type::Date => "TIMESTAMPTZ".to_string(),
            Type::Json => "JSONB".to_string(),
            Type::Array(element) => format!("{}[]", element.sql_name()),
            Type::Vector(dimensions) => format!("VECTOR({dimensions})"),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Type::Json)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Type::Date)
    }

    /// Element type of a native array column.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_name())
    }
}

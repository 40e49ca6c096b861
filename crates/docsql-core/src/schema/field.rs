use super::Type;
use crate::stmt::Value;

/// A table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,

    pub ty: Type,

    /// Whether or not the column is nullable
    pub nullable: bool,

    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A constant, rendered as an SQL literal
    Literal(Value),
    /// A raw SQL expression such as `NOW()`
    Expr(String),
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Field {
        Field {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Field {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Field {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Field {
        self.default = Some(DefaultValue::Expr(expr.into()));
        self
    }

    /// The column default as SQL, `None` when the column has no default.
    pub fn default_value_sql(&self) -> Option<String> {
        match self.default.as_ref()? {
            DefaultValue::Expr(expr) => Some(expr.clone()),
            DefaultValue::Literal(value @ (Value::Array(_) | Value::Document(_)))
                if !self.ty.is_json() =>
            {
                // native arrays take the array literal syntax
                Some(format!(
                    "{}::{}",
                    Value::String(array_literal(value)).to_sql_literal(),
                    self.ty.sql_name()
                ))
            }
            DefaultValue::Literal(value) => Some(value.to_sql_literal()),
        }
    }
}

fn array_literal(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
                    Value::Null => "NULL".to_string(),
                    other => array_literal(other),
                })
                .collect::<Vec<_>>();
            format!("{{{}}}", items.join(","))
        }
        other => other.to_string(),
    }
}

use super::{Document, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Parses `1` / `-1` (and `"asc"` / `"desc"`).
    pub fn parse(field: &str, value: &Value) -> Result<Direction> {
        match value {
            Value::I64(1) => Ok(Direction::Asc),
            Value::I64(-1) => Ok(Direction::Desc),
            Value::F64(v) if *v == 1.0 => Ok(Direction::Asc),
            Value::F64(v) if *v == -1.0 => Ok(Direction::Desc),
            Value::String(s) if s.eq_ignore_ascii_case("asc") => Ok(Direction::Asc),
            Value::String(s) if s.eq_ignore_ascii_case("desc") => Ok(Direction::Desc),
            other => Err(Error::invalid_statement(format!(
                "invalid sort direction for {field:?}: {other}"
            ))),
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Direction::Asc => Value::I64(1),
            Direction::Desc => Value::I64(-1),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sort {
    pub fields: Vec<(String, Direction)>,
}

impl Sort {
    pub fn parse(doc: &Document) -> Result<Sort> {
        let fields = doc
            .iter()
            .map(|(field, value)| Ok((field.to_string(), Direction::parse(field, value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sort { fields })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

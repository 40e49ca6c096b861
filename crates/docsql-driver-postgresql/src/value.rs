use chrono::{DateTime, NaiveDateTime, Utc};
use docsql_core::{
    stmt::{Document, Value},
    Error, Result,
};
use postgres::{
    types::{private::BytesMut, to_sql_checked, FromSql, IsNull, Json, Kind, ToSql, Type},
    Column, Row,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// Binds a [`Value`] to a parameter of whatever type the server inferred
/// for it.
///
/// Compiled SQL leaves most parameter types to the server, so the same value
/// may be sent as `INT4` in one statement and `FLOAT8` or `JSONB` in the next.
#[derive(Debug)]
pub struct Param<'a>(pub &'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        if let Value::Null = self.0 {
            return Ok(IsNull::Yes);
        }

        if *ty == Type::JSON || *ty == Type::JSONB {
            return Json(self.0.to_json()).to_sql(ty, out);
        }

        if let Kind::Array(_) = ty.kind() {
            return match self.0 {
                Value::Array(values) => values.iter().map(Param).collect::<Vec<_>>().to_sql(ty, out),
                value => Err(mismatch(value, ty)),
            };
        }

        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(value) => match *ty {
                Type::BOOL => value.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::I64(value) => match *ty {
                Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                Type::INT8 => value.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::FLOAT8 => (*value as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*value).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::F64(value) => match *ty {
                Type::FLOAT8 => value.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 if value.fract() == 0.0 => {
                    Param(&Value::I64(*value as i64)).to_sql(ty, out)
                }
                Type::NUMERIC => Decimal::from_f64_retain(*value)
                    .ok_or_else(|| mismatch(self.0, ty))?
                    .to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::String(value) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                    value.as_str().to_sql(ty, out)
                }
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::Date(value) => match *ty {
                Type::TIMESTAMPTZ => value.to_sql(ty, out),
                Type::TIMESTAMP => value.naive_utc().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_rfc3339().to_sql(ty, out),
                _ => Err(mismatch(self.0, ty)),
            },
            Value::Array(_) | Value::Document(_) => Err(mismatch(self.0, ty)),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind a {} value to a parameter of type {ty}", value.kind_name()).into()
}

/// Converts a row into a document keyed by column name.
pub fn document_from_row(row: &Row) -> Result<Document> {
    let mut document = Document::new();
    for (index, column) in row.columns().iter().enumerate() {
        document.insert(column.name(), postgres_to_docsql(row, index, column)?);
    }
    Ok(document)
}

/// Converts a PostgreSQL value within a row to a [`Value`].
fn postgres_to_docsql(row: &Row, index: usize, column: &Column) -> Result<Value> {
    let ty = column.type_();

    // NOTE: the PostgreSQL type enum is opaque, so each type is matched
    // against its constant.
    match *ty {
        Type::BOOL => get::<bool>(row, index),
        Type::INT2 => Ok(Value::from(
            row.try_get::<usize, Option<i16>>(index)
                .map_err(Error::driver)?
                .map(i32::from),
        )),
        Type::INT4 => get::<i32>(row, index),
        Type::INT8 => get::<i64>(row, index),
        Type::FLOAT4 => Ok(Value::from(
            row.try_get::<usize, Option<f32>>(index)
                .map_err(Error::driver)?
                .map(f64::from),
        )),
        Type::FLOAT8 => get::<f64>(row, index),
        Type::NUMERIC => {
            match row
                .try_get::<usize, Option<Decimal>>(index)
                .map_err(Error::driver)?
            {
                None => Ok(Value::Null),
                Some(decimal) => decimal.to_f64().map(Value::F64).ok_or_else(|| {
                    Error::type_conversion(Value::String(decimal.to_string()), "f64")
                }),
            }
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => get::<String>(row, index),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, index),
        Type::TIMESTAMP => Ok(Value::from(
            row.try_get::<usize, Option<NaiveDateTime>>(index)
                .map_err(Error::driver)?
                .map(|naive| naive.and_utc()),
        )),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, index),
        Type::BOOL_ARRAY => get::<Vec<Option<bool>>>(row, index),
        Type::INT4_ARRAY => get::<Vec<Option<i32>>>(row, index),
        Type::INT8_ARRAY => get::<Vec<Option<i64>>>(row, index),
        Type::FLOAT8_ARRAY => get::<Vec<Option<f64>>>(row, index),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get::<Vec<Option<String>>>(row, index),
        Type::TIMESTAMPTZ_ARRAY => get::<Vec<Option<DateTime<Utc>>>>(row, index),
        Type::JSONB_ARRAY => get::<Vec<Option<serde_json::Value>>>(row, index),
        _ => Err(Error::not_implemented(format!(
            "reading column {:?} of type {ty}",
            column.name()
        ))),
    }
}

fn get<'a, T>(row: &'a Row, index: usize) -> Result<Value>
where
    T: FromSql<'a> + Into<Value>,
{
    let value = row
        .try_get::<usize, Option<T>>(index)
        .map_err(Error::driver)?;
    Ok(Value::from(value))
}

use super::{Document, Value};
use crate::{Error, Result};

/// A single test applied to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    /// Every listed value is contained in the (array) field.
    All(Vec<Value>),
    Exists(bool),
    GeoWithin(GeoWithin),
    Regex {
        pattern: String,
        case_insensitive: bool,
    },
    Size(i64),
    Not(Vec<Condition>),
}

/// `{$geoWithin: {$centerSphere: [[lng, lat], radius]}}`, radius in miles.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoWithin {
    pub lng: Value,
    pub lat: Value,
    pub radius: Value,
    /// Field path holding the `{lng, lat}` object, taken from
    /// `$comment.locationName`. Defaults to the field the condition is on.
    pub location: Option<String>,
}

impl Condition {
    /// Parses the value side of a `{field: value}` selector entry.
    pub fn parse_list(field: &str, value: &Value) -> Result<Vec<Condition>> {
        let Value::Document(doc) = value else {
            return Ok(vec![Condition::Eq(value.clone())]);
        };

        let operators = doc.keys().filter(|key| key.starts_with('$')).count();
        if operators == 0 {
            // A literal sub-document compared for equality
            return Ok(vec![Condition::Eq(value.clone())]);
        }
        if operators != doc.len() {
            return Err(Error::invalid_statement(format!(
                "selector on {field:?} mixes operators and plain keys"
            )));
        }

        parse_operators(field, doc)
    }
}

fn parse_operators(field: &str, doc: &Document) -> Result<Vec<Condition>> {
    let mut conditions = vec![];

    for (op, value) in doc.iter() {
        let condition = match op {
            "$comment" | "$options" => continue,
            "$eq" => Condition::Eq(value.clone()),
            "$ne" => Condition::Ne(value.clone()),
            "$gt" => Condition::Gt(value.clone()),
            "$gte" => Condition::Gte(value.clone()),
            "$lt" => Condition::Lt(value.clone()),
            "$lte" => Condition::Lte(value.clone()),
            "$in" => Condition::In(list(field, op, value)?),
            "$nin" => Condition::Nin(list(field, op, value)?),
            "$all" => Condition::All(list(field, op, value)?),
            "$exists" => Condition::Exists(value.is_truthy()),
            "$size" => match value.as_i64() {
                Some(size) => Condition::Size(size),
                None => {
                    return Err(Error::invalid_statement(format!(
                        "$size on {field:?} expects an integer"
                    )))
                }
            },
            "$regex" => {
                let Some(pattern) = value.as_str() else {
                    return Err(Error::invalid_statement(format!(
                        "$regex on {field:?} expects a string"
                    )));
                };
                Condition::Regex {
                    pattern: pattern.to_string(),
                    case_insensitive: regex_options(field, doc.get("$options"))?,
                }
            }
            "$not" => match value {
                Value::Document(inner) => Condition::Not(parse_operators(field, inner)?),
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "$not on {field:?} expects an operator object"
                    )))
                }
            },
            "$geoWithin" => Condition::GeoWithin(GeoWithin::parse(field, value)?),
            _ => return Err(Error::not_implemented(format!("selector operator {op}"))),
        };
        conditions.push(condition);
    }

    if doc.contains_key("$options") && !doc.contains_key("$regex") {
        return Err(Error::invalid_statement(format!(
            "$options on {field:?} without $regex"
        )));
    }

    Ok(conditions)
}

fn list(field: &str, op: &str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        other => Err(Error::invalid_statement(format!(
            "{op} on {field:?} expects an array, got {}",
            other.kind_name()
        ))),
    }
}

fn regex_options(field: &str, options: Option<&Value>) -> Result<bool> {
    let Some(options) = options else {
        return Ok(false);
    };
    let Some(options) = options.as_str() else {
        return Err(Error::invalid_statement(format!(
            "$options on {field:?} expects a string"
        )));
    };

    let mut case_insensitive = false;
    for flag in options.chars() {
        match flag {
            'i' => case_insensitive = true,
            other => return Err(Error::not_implemented(format!("regex option {other:?}"))),
        }
    }
    Ok(case_insensitive)
}

impl GeoWithin {
    fn parse(field: &str, value: &Value) -> Result<GeoWithin> {
        let invalid = || {
            Error::invalid_statement(format!(
                "$geoWithin on {field:?} expects {{$centerSphere: [[lng, lat], radius]}}"
            ))
        };

        let doc = value.as_document().ok_or_else(invalid)?;

        for key in doc.keys() {
            if key != "$centerSphere" && key != "$comment" {
                return Err(Error::not_implemented(format!("$geoWithin shape {key}")));
            }
        }

        let center_sphere = doc
            .get("$centerSphere")
            .and_then(Value::as_array)
            .ok_or_else(invalid)?;

        let [center, radius] = center_sphere else {
            return Err(invalid());
        };
        let [lng, lat] = center.as_array().ok_or_else(invalid)? else {
            return Err(invalid());
        };

        let location = match doc.get("$comment") {
            Some(Value::Document(comment)) => match comment.get("locationName") {
                Some(Value::String(name)) => Some(name.clone()),
                Some(_) => return Err(invalid()),
                None => None,
            },
            _ => None,
        };

        Ok(GeoWithin {
            lng: lng.clone(),
            lat: lat.clone(),
            radius: radius.clone(),
            location,
        })
    }
}

use super::{Document, Selector, Value};
use crate::{Error, Result};

/// An aggregation expression, as used by `$addFields`, computed projections
/// and `$group` keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `"$a"`
    Field(String),
    Literal(Value),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Abs(Box<Expr>),
    /// `LEAST(..)`
    Min(Vec<Expr>),
    /// `GREATEST(..)`
    Max(Vec<Expr>),
    IfNull(Box<Expr>, Box<Expr>),
    Cond {
        test: Box<CondTest>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Compare(BinaryOp, Box<Expr>, Box<Expr>),
    /// `$first` outside of a group is the plain value.
    First(Box<Expr>),
}

/// The `if` branch of a `$cond`.
#[derive(Debug, Clone, PartialEq)]
pub enum CondTest {
    /// `if: "$field"` tests that the field is present.
    Exists(String),
    Expr(Expr),
    Selector(Selector),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Push,
    AddToSet,
}

/// An aggregate computed over the rows of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub op: AggregateOp,
    /// `None` for `{$count: {}}`.
    pub arg: Option<Expr>,
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Expr {
        Expr::Field(name.into())
    }

    pub fn parse(value: &Value) -> Result<Expr> {
        match value {
            Value::String(s) if s.starts_with("$$") => {
                Err(Error::not_implemented(format!("expression variable {s}")))
            }
            Value::String(s) if s.starts_with('$') => Ok(Expr::Field(s[1..].to_string())),
            Value::Document(doc) => match doc.single() {
                Some((op, arg)) if op.starts_with('$') => parse_operator(op, arg),
                _ if doc.keys().any(|key| key.starts_with('$')) => Err(
                    Error::invalid_statement("expression objects take exactly one operator"),
                ),
                _ => Ok(Expr::Literal(value.clone())),
            },
            _ => Ok(Expr::Literal(value.clone())),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }
}

fn parse_operator(op: &str, arg: &Value) -> Result<Expr> {
    Ok(match op {
        "$add" => Expr::Add(list(op, arg)?),
        "$multiply" => Expr::Multiply(list(op, arg)?),
        "$subtract" => {
            let (a, b) = pair(op, arg)?;
            Expr::Subtract(Box::new(a), Box::new(b))
        }
        "$divide" => {
            let (a, b) = pair(op, arg)?;
            Expr::Divide(Box::new(a), Box::new(b))
        }
        "$abs" => Expr::Abs(Box::new(Expr::parse(arg)?)),
        "$min" => Expr::Min(list(op, arg)?),
        "$max" => Expr::Max(list(op, arg)?),
        "$ifNull" => {
            let (a, b) = pair(op, arg)?;
            Expr::IfNull(Box::new(a), Box::new(b))
        }
        "$first" => Expr::First(Box::new(Expr::parse(arg)?)),
        "$cond" => parse_cond(arg)?,
        _ => match BinaryOp::from_operator(op) {
            Some(binary) => {
                let (a, b) = pair(op, arg)?;
                Expr::Compare(binary, Box::new(a), Box::new(b))
            }
            None => return Err(Error::not_implemented(format!("expression operator {op}"))),
        },
    })
}

fn parse_cond(arg: &Value) -> Result<Expr> {
    let (test, then, otherwise) = match arg {
        Value::Document(doc) => {
            let branch = |name: &str| {
                doc.get(name).ok_or_else(|| {
                    Error::invalid_statement(format!("$cond is missing its {name:?} branch"))
                })
            };
            (branch("if")?, branch("then")?, branch("else")?)
        }
        Value::Array(items) => match &items[..] {
            [test, then, otherwise] => (test, then, otherwise),
            _ => {
                return Err(Error::invalid_statement(
                    "$cond expects [if, then, else]",
                ))
            }
        },
        other => {
            return Err(Error::invalid_statement(format!(
                "$cond expects an object or an array, got {}",
                other.kind_name()
            )))
        }
    };

    Ok(Expr::Cond {
        test: Box::new(CondTest::parse(test)?),
        then: Box::new(Expr::parse(then)?),
        otherwise: Box::new(Expr::parse(otherwise)?),
    })
}

fn list(op: &str, arg: &Value) -> Result<Vec<Expr>> {
    let exprs = match arg {
        Value::Array(items) => items.iter().map(Expr::parse).collect::<Result<Vec<_>>>()?,
        other => vec![Expr::parse(other)?],
    };
    if exprs.is_empty() {
        return Err(Error::invalid_statement(format!("{op} requires an argument")));
    }
    Ok(exprs)
}

fn pair(op: &str, arg: &Value) -> Result<(Expr, Expr)> {
    match arg.as_array() {
        Some([a, b]) => Ok((Expr::parse(a)?, Expr::parse(b)?)),
        _ => Err(Error::invalid_statement(format!(
            "{op} expects exactly two arguments"
        ))),
    }
}

impl CondTest {
    pub fn parse(value: &Value) -> Result<CondTest> {
        match value {
            Value::String(s) if s.starts_with('$') => Ok(CondTest::Exists(s[1..].to_string())),
            Value::Document(doc) => match doc.single() {
                Some((op, Value::Array(_))) if BinaryOp::from_operator(op).is_some() => {
                    Ok(CondTest::Expr(Expr::parse(value)?))
                }
                _ => Ok(CondTest::Selector(Selector::parse(doc)?)),
            },
            other => Ok(CondTest::Expr(Expr::Literal(other.clone()))),
        }
    }
}

impl BinaryOp {
    pub fn from_operator(op: &str) -> Option<BinaryOp> {
        Some(match op {
            "$eq" => BinaryOp::Eq,
            "$ne" => BinaryOp::Ne,
            "$gt" => BinaryOp::Gt,
            "$gte" => BinaryOp::Ge,
            "$lt" => BinaryOp::Lt,
            "$lte" => BinaryOp::Le,
            _ => return None,
        })
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
        }
    }
}

impl AggregateOp {
    pub fn from_operator(op: &str) -> Option<AggregateOp> {
        Some(match op {
            "$sum" => AggregateOp::Sum,
            "$avg" => AggregateOp::Avg,
            "$count" => AggregateOp::Count,
            "$min" => AggregateOp::Min,
            "$max" => AggregateOp::Max,
            "$push" => AggregateOp::Push,
            "$addToSet" => AggregateOp::AddToSet,
            _ => return None,
        })
    }
}

impl Aggregate {
    /// Parses `{$sum: "$a"}`-style aggregate objects.
    pub fn parse(doc: &Document) -> Result<Aggregate> {
        let Some((op, arg)) = doc.single() else {
            return Err(Error::invalid_statement(
                "aggregate objects take exactly one operator",
            ));
        };
        let Some(op) = AggregateOp::from_operator(op) else {
            return Err(Error::not_implemented(format!("aggregate operator {op}")));
        };

        let arg = match (op, arg) {
            (AggregateOp::Count, Value::Document(doc)) if doc.is_empty() => None,
            _ => Some(Expr::parse(arg)?),
        };

        Ok(Aggregate { op, arg })
    }
}

/// Returns whether a `$group` field value is an aggregate.
///
/// Only a document whose sole key is an aggregate operator qualifies.
/// `$first` is a plain value and strings are field references, so neither
/// is an aggregate. Any other kind of value is rejected.
pub fn is_group_by_aggregate(value: &Value) -> Result<bool> {
    match value {
        Value::Null | Value::String(_) => Ok(false),
        Value::Document(doc) => Ok(doc
            .single()
            .is_some_and(|(op, _)| AggregateOp::from_operator(op).is_some())),
        other => Err(Error::invalid_statement(format!(
            "invalid group-by field value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn group_by_aggregates() {
        assert!(!is_group_by_aggregate(&Value::Null).unwrap());
        assert!(!is_group_by_aggregate(&value(serde_json::json!("$a"))).unwrap());
        assert!(!is_group_by_aggregate(&value(serde_json::json!({"$first": "$a"}))).unwrap());
        assert!(is_group_by_aggregate(&value(serde_json::json!({"$sum": "$a"}))).unwrap());
        assert!(is_group_by_aggregate(&value(serde_json::json!({"$avg": "$a"}))).unwrap());
        assert!(is_group_by_aggregate(&value(serde_json::json!({"$count": {}}))).unwrap());
        assert!(is_group_by_aggregate(&Value::Bool(false)).is_err());
        assert!(is_group_by_aggregate(&Value::I64(1)).is_err());
    }

    #[test]
    fn cond_test_forms() {
        assert_eq!(
            CondTest::parse(&value(serde_json::json!("$b"))).unwrap(),
            CondTest::Exists("b".to_string())
        );
        assert!(matches!(
            CondTest::parse(&value(serde_json::json!({"$gt": ["$a", 1]}))).unwrap(),
            CondTest::Expr(Expr::Compare(BinaryOp::Gt, _, _))
        ));
        assert!(matches!(
            CondTest::parse(&value(serde_json::json!({"b": 3}))).unwrap(),
            CondTest::Selector(_)
        ));
    }

    #[test]
    fn unknown_operator_is_not_implemented() {
        let err = Expr::parse(&value(serde_json::json!({"$pow": [2, 3]}))).unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn literal_documents() {
        let literal = Expr::parse(&value(serde_json::json!({"a": 1}))).unwrap();
        assert!(matches!(literal, Expr::Literal(Value::Document(_))));
    }
}

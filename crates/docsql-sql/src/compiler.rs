use crate::{
    query::{Arg, Atom},
    scope::{Resolved, Scope},
};

use docsql_core::{
    schema::Type,
    stmt::{
        Aggregate, AggregateOp, Clause, CondTest, Condition, Expr, GeoWithin, Selector, Value,
    },
    Error, Result,
};

/// Compiles selectors and expressions against a [`Scope`] into atoms.
///
/// Every function appends to `out`; arguments are pushed in source order so
/// placeholders number left to right.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Compiler<'a> {
    scope: &'a Scope,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(scope: &'a Scope) -> Compiler<'a> {
        Compiler { scope }
    }

    /// Compiles a selector. An empty selector appends nothing.
    pub(crate) fn selector(&self, selector: &Selector, out: &mut Vec<Atom>) -> Result<()> {
        match &selector.clauses[..] {
            [] => Ok(()),
            [clause] => self.clause(clause, out),
            clauses => {
                out.push(Atom::raw("("));
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        out.push(Atom::raw("AND"));
                    }
                    self.clause(clause, out)?;
                }
                out.push(Atom::raw(")"));
                Ok(())
            }
        }
    }

    /// Like [`Compiler::selector`] but an empty selector is `TRUE`.
    fn predicate(&self, selector: &Selector, out: &mut Vec<Atom>) -> Result<()> {
        if selector.is_empty() {
            out.push(Atom::raw("TRUE"));
            Ok(())
        } else {
            self.selector(selector, out)
        }
    }

    fn clause(&self, clause: &Clause, out: &mut Vec<Atom>) -> Result<()> {
        match clause {
            Clause::Field { field, conditions } => match &conditions[..] {
                [condition] => self.condition(field, condition, out),
                conditions => self.conjunction(field, conditions, out),
            },
            Clause::And(selectors) => self.combine(selectors, "AND", out),
            Clause::Or(selectors) => self.combine(selectors, "OR", out),
            Clause::Nor(selectors) => {
                out.push(Atom::raw("NOT ("));
                self.combine(selectors, "OR", out)?;
                out.push(Atom::raw(")"));
                Ok(())
            }
        }
    }

    fn combine(&self, selectors: &[Selector], op: &str, out: &mut Vec<Atom>) -> Result<()> {
        out.push(Atom::raw("("));
        for (i, selector) in selectors.iter().enumerate() {
            if i > 0 {
                out.push(Atom::raw(op));
            }
            self.predicate(selector, out)?;
        }
        out.push(Atom::raw(")"));
        Ok(())
    }

    fn conjunction(&self, field: &str, conditions: &[Condition], out: &mut Vec<Atom>) -> Result<()> {
        out.push(Atom::raw("("));
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                out.push(Atom::raw("AND"));
            }
            self.condition(field, condition, out)?;
        }
        out.push(Atom::raw(")"));
        Ok(())
    }

    fn condition(&self, field: &str, condition: &Condition, out: &mut Vec<Atom>) -> Result<()> {
        match condition {
            Condition::Eq(Value::Null) | Condition::Exists(false) => {
                out.push(Atom::Raw(self.scope.resolve(field, None)?.sql));
                out.push(Atom::raw("IS NULL"));
            }
            Condition::Ne(Value::Null) | Condition::Exists(true) => {
                out.push(Atom::Raw(self.scope.resolve(field, None)?.sql));
                out.push(Atom::raw("IS NOT NULL"));
            }
            Condition::Eq(value) => {
                let resolved = self.scope.resolve(field, value.type_hint())?;
                if is_native_array(&resolved.ty) && !matches!(value, Value::Array(_)) {
                    out.push(Atom::Arg(Arg::new(value.clone())));
                    out.push(Atom::raw("= ANY("));
                    out.push(Atom::Raw(resolved.sql));
                    out.push(Atom::raw(")"));
                } else {
                    self.compare(resolved, "=", value, out);
                }
            }
            Condition::Ne(value) => {
                let resolved = self.scope.resolve(field, value.type_hint())?;
                if is_native_array(&resolved.ty) && !matches!(value, Value::Array(_)) {
                    out.push(Atom::raw("NOT ("));
                    out.push(Atom::Arg(Arg::new(value.clone())));
                    out.push(Atom::raw("= ANY("));
                    out.push(Atom::Raw(resolved.sql));
                    out.push(Atom::raw(") )"));
                } else {
                    self.compare(resolved, "<>", value, out);
                }
            }
            Condition::Gt(value) => self.ordering(field, ">", value, out)?,
            Condition::Gte(value) => self.ordering(field, ">=", value, out)?,
            Condition::Lt(value) => self.ordering(field, "<", value, out)?,
            Condition::Lte(value) => self.ordering(field, "<=", value, out)?,
            Condition::In(values) => self.contains(field, values, out)?,
            Condition::Nin(values) => {
                out.push(Atom::raw("NOT ("));
                self.contains(field, values, out)?;
                out.push(Atom::raw(")"));
            }
            Condition::All(values) => self.all(field, values, out)?,
            Condition::GeoWithin(geo) => self.geo_within(field, geo, out)?,
            Condition::Regex {
                pattern,
                case_insensitive,
            } => {
                let resolved = self.scope.resolve(field, Some("TEXT"))?;
                out.push(Atom::Raw(resolved.sql));
                out.push(Atom::raw(if *case_insensitive { "~*" } else { "~" }));
                out.push(Atom::Arg(Arg::new(pattern.as_str())));
            }
            Condition::Size(size) => {
                let resolved = self.scope.resolve(field, None)?;
                let function = match &resolved.ty {
                    Some(Type::Array(_)) => "CARDINALITY(",
                    Some(Type::Json) | None => "JSONB_ARRAY_LENGTH(",
                    Some(_) => {
                        return Err(Error::invalid_statement(format!(
                            "$size on non-array field {field:?}"
                        )))
                    }
                };
                out.push(Atom::raw(function));
                out.push(Atom::Raw(resolved.sql));
                out.push(Atom::raw(")"));
                out.push(Atom::raw("="));
                out.push(Atom::Arg(Arg::new(*size)));
            }
            Condition::Not(conditions) => {
                out.push(Atom::raw("NOT ("));
                match &conditions[..] {
                    [condition] => self.condition(field, condition, out)?,
                    conditions => self.conjunction(field, conditions, out)?,
                }
                out.push(Atom::raw(")"));
            }
        }
        Ok(())
    }

    fn compare(&self, lhs: Resolved, op: &str, value: &Value, out: &mut Vec<Atom>) {
        let arg = if narrows(&lhs.ty, value) {
            Arg::hinted(value)
        } else {
            Arg::new(value.clone())
        };
        out.push(Atom::Raw(lhs.sql));
        out.push(Atom::raw(op));
        out.push(Atom::Arg(arg));
    }

    fn ordering(&self, field: &str, op: &str, value: &Value, out: &mut Vec<Atom>) -> Result<()> {
        let resolved = self.scope.resolve(field, value.type_hint())?;
        self.compare(resolved, op, value, out);
        Ok(())
    }

    /// `$in`: the field must be one of `values`.
    fn contains(&self, field: &str, values: &[Value], out: &mut Vec<Atom>) -> Result<()> {
        if values.is_empty() {
            out.push(Atom::raw("FALSE"));
            return Ok(());
        }

        let declared = self.scope.resolve(field, None)?;
        match &declared.ty {
            Some(Type::Array(element)) => {
                out.push(Atom::Raw(declared.sql));
                out.push(Atom::raw("&&"));
                self.array(values, &element.sql_name(), out);
            }
            Some(ty) if !ty.is_json() => {
                if values.iter().any(|value| narrows(&declared.ty, value)) {
                    self.array(values, "REAL", out);
                    out.push(Atom::raw("@>"));
                    out.push(Atom::Raw(format!("ARRAY[{}::REAL]", declared.sql)));
                } else {
                    self.array(values, &ty.sql_name(), out);
                    out.push(Atom::raw("@>"));
                    out.push(Atom::Raw(format!("ARRAY[{}]", declared.sql)));
                }
            }
            _ => {
                let element = uniform_hint(field, values)?;
                let resolved = self.scope.resolve(field, Some(element))?;
                self.array(values, element, out);
                out.push(Atom::raw("@>"));
                out.push(Atom::Raw(format!("ARRAY[{}]", resolved.sql)));
            }
        }
        Ok(())
    }

    /// `$all`: the array field holds every one of `values`.
    fn all(&self, field: &str, values: &[Value], out: &mut Vec<Atom>) -> Result<()> {
        if values.is_empty() {
            out.push(Atom::raw("TRUE"));
            return Ok(());
        }

        let resolved = self.scope.resolve(field, None)?;
        match &resolved.ty {
            Some(Type::Array(element)) => {
                out.push(Atom::Raw(resolved.sql));
                out.push(Atom::raw("@>"));
                self.array(values, &element.sql_name(), out);
            }
            Some(Type::Json) | None => {
                out.push(Atom::Raw(resolved.sql));
                out.push(Atom::raw("@>"));
                out.push(Atom::Arg(Arg::typed(Value::Array(values.to_vec()), "JSONB")));
            }
            Some(_) => {
                return Err(Error::invalid_statement(format!(
                    "$all on non-array field {field:?}"
                )))
            }
        }
        Ok(())
    }

    /// `ARRAY[ $1 , $2 ]::<element>[]`
    fn array(&self, values: &[Value], element: &str, out: &mut Vec<Atom>) {
        out.push(Atom::raw("ARRAY["));
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                out.push(Atom::raw(","));
            }
            out.push(Atom::Arg(Arg::new(value.clone())));
        }
        out.push(Atom::Raw(format!("]::{element}[]")));
    }

    fn geo_within(&self, field: &str, geo: &GeoWithin, out: &mut Vec<Atom>) -> Result<()> {
        let location = self
            .scope
            .resolve_json(geo.location.as_deref().unwrap_or(field))?;

        out.push(Atom::Raw(format!(
            "(EARTH_DISTANCE(LL_TO_EARTH(({location}->>'lng')::FLOAT8, ({location}->>'lat')::FLOAT8), LL_TO_EARTH("
        )));
        out.push(Atom::Arg(Arg::new(geo.lng.clone())));
        out.push(Atom::raw(","));
        out.push(Atom::Arg(Arg::new(geo.lat.clone())));
        out.push(Atom::raw(")) * 0.000621371) <"));
        out.push(Atom::Arg(Arg::new(geo.radius.clone())));
        Ok(())
    }

    /// Compiles an expression in select-list position. A bare literal there
    /// carries its type; untyped, it would be returned as text.
    pub(crate) fn output(&self, expr: &Expr, out: &mut Vec<Atom>) -> Result<()> {
        match expr {
            Expr::Literal(value) if !value.is_null() => {
                out.push(Atom::Arg(Arg::hinted(value)));
                Ok(())
            }
            expr => self.expr(expr, out),
        }
    }

    pub(crate) fn expr(&self, expr: &Expr, out: &mut Vec<Atom>) -> Result<()> {
        match expr {
            Expr::Field(name) => out.push(Atom::Raw(self.scope.resolve(name, None)?.sql)),
            Expr::Literal(Value::Null) => out.push(Atom::raw("NULL")),
            Expr::Literal(value) => out.push(Atom::Arg(Arg::new(value.clone()))),
            Expr::Add(exprs) => self.chain(exprs, "+", out)?,
            Expr::Multiply(exprs) => self.chain(exprs, "*", out)?,
            Expr::Subtract(lhs, rhs) if self.is_date(lhs) || self.is_date(rhs) => {
                out.push(Atom::raw("(1000 * EXTRACT(EPOCH FROM"));
                self.expr(lhs, out)?;
                out.push(Atom::raw("-"));
                self.expr(rhs, out)?;
                out.push(Atom::raw("))"));
            }
            Expr::Subtract(lhs, rhs) => self.binary(lhs, "-", rhs, out)?,
            Expr::Divide(lhs, rhs) => self.binary(lhs, "/", rhs, out)?,
            Expr::Compare(op, lhs, rhs) => self.binary(lhs, op.as_sql(), rhs, out)?,
            Expr::Abs(arg) => self.call("ABS(", std::slice::from_ref(&**arg), out)?,
            Expr::Min(args) => self.call("LEAST(", args, out)?,
            Expr::Max(args) => self.call("GREATEST(", args, out)?,
            Expr::IfNull(value, fallback) => {
                out.push(Atom::raw("COALESCE("));
                self.expr(value, out)?;
                out.push(Atom::raw(","));
                self.expr(fallback, out)?;
                out.push(Atom::raw(")"));
            }
            Expr::Cond {
                test,
                then,
                otherwise,
            } => {
                out.push(Atom::raw("(CASE WHEN"));
                self.cond_test(test, out)?;
                out.push(Atom::raw("THEN"));
                self.expr(then, out)?;
                out.push(Atom::raw("ELSE"));
                self.expr(otherwise, out)?;
                out.push(Atom::raw("END)"));

                if let Some(hint) = then.as_literal().and_then(Value::type_hint) {
                    out.push(Atom::Raw(format!("::{hint}")));
                }
            }
            Expr::First(arg) => self.expr(arg, out)?,
        }
        Ok(())
    }

    fn cond_test(&self, test: &CondTest, out: &mut Vec<Atom>) -> Result<()> {
        match test {
            CondTest::Exists(field) => {
                out.push(Atom::Raw(self.scope.resolve(field, None)?.sql));
                out.push(Atom::raw("IS NOT NULL"));
                Ok(())
            }
            CondTest::Expr(expr) => self.expr(expr, out),
            CondTest::Selector(selector) => self.predicate(selector, out),
        }
    }

    fn chain(&self, exprs: &[Expr], op: &str, out: &mut Vec<Atom>) -> Result<()> {
        if let [expr] = exprs {
            return self.expr(expr, out);
        }

        out.push(Atom::raw("("));
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                out.push(Atom::raw(op));
            }
            self.expr(expr, out)?;
        }
        out.push(Atom::raw(")"));
        Ok(())
    }

    fn binary(&self, lhs: &Expr, op: &str, rhs: &Expr, out: &mut Vec<Atom>) -> Result<()> {
        out.push(Atom::raw("("));
        self.expr(lhs, out)?;
        out.push(Atom::raw(op));
        self.expr(rhs, out)?;
        out.push(Atom::raw(")"));
        Ok(())
    }

    fn call(&self, function: &str, args: &[Expr], out: &mut Vec<Atom>) -> Result<()> {
        out.push(Atom::raw(function));
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(Atom::raw(","));
            }
            self.expr(arg, out)?;
        }
        out.push(Atom::raw(")"));
        Ok(())
    }

    fn is_date(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(value) => value.is_date(),
            Expr::Field(name) => self.scope.field_type(name).is_some_and(Type::is_date),
            _ => false,
        }
    }

    pub(crate) fn aggregate(&self, aggregate: &Aggregate, out: &mut Vec<Atom>) -> Result<()> {
        let function = match aggregate.op {
            AggregateOp::Count if aggregate.arg.is_none() => {
                out.push(Atom::raw("COUNT(*)"));
                return Ok(());
            }
            AggregateOp::Sum => "SUM(",
            AggregateOp::Avg => "AVG(",
            AggregateOp::Count => "COUNT(",
            AggregateOp::Min => "MIN(",
            AggregateOp::Max => "MAX(",
            AggregateOp::Push => "ARRAY_AGG(",
            AggregateOp::AddToSet => "ARRAY_AGG(DISTINCT",
        };

        out.push(Atom::raw(function));
        match &aggregate.arg {
            // Untyped placeholders inside aggregates can't be inferred
            Some(Expr::Literal(value)) if !value.is_null() => {
                out.push(Atom::Arg(Arg::hinted(value)))
            }
            Some(expr) => self.expr(expr, out)?,
            None => out.push(Atom::raw("*")),
        }
        out.push(Atom::raw(")"));
        Ok(())
    }

    /// The declared type an expression produces, when it is a plain field.
    pub(crate) fn expr_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Field(name) => self.scope.field_type(name).cloned(),
            Expr::First(inner) => self.expr_type(inner),
            _ => None,
        }
    }
}

fn is_native_array(ty: &Option<Type>) -> bool {
    matches!(ty, Some(Type::Array(_)))
}

/// A float compared against an integer column. Untyped, the parameter would
/// be inferred as the column's integer type and fail to bind.
fn narrows(declared: &Option<Type>, value: &Value) -> bool {
    matches!(
        (declared, value),
        (Some(Type::Int | Type::BigInt), Value::F64(_))
    )
}

/// The one element type every value of an `$in` list shares. Integers mixed
/// with floats widen to `REAL`.
fn uniform_hint(field: &str, values: &[Value]) -> Result<&'static str> {
    let mut hint: Option<&'static str> = None;

    for value in values {
        let Some(next) = value.type_hint() else {
            return Err(Error::invalid_statement(format!(
                "$in on {field:?} only supports scalar values, got {}",
                value.kind_name()
            )));
        };

        hint = match (hint, next) {
            (None, next) => Some(next),
            (Some(prev), next) if prev == next => Some(prev),
            (Some("INTEGER" | "REAL"), "INTEGER" | "REAL") => Some("REAL"),
            (Some(prev), next) => {
                return Err(Error::invalid_statement(format!(
                    "$in on {field:?} mixes {prev} and {next} values"
                )))
            }
        };
    }

    hint.ok_or_else(|| Error::invalid_statement(format!("$in on {field:?} has no values")))
}

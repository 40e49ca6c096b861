use super::{is_group_by_aggregate, Aggregate, Document, Expr, Projection, Selector, Sort, Value};
use crate::{Error, Result};

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Selector),
    Lookup(Lookup),
    AddFields(AddFields),
    Project(Projection),
    Group(Group),
    Sort(Sort),
    Skip(u64),
    Limit(u64),
    /// `{$count: "name"}`
    Count(String),
}

/// The simple `{from, localField, foreignField, as}` form of `$lookup`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AddFields {
    pub fields: Vec<(String, Expr)>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Group {
    pub items: Vec<(String, GroupItem)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupItem {
    /// Part of the grouping key.
    Key(Expr),
    Aggregate(Aggregate),
}

impl Stage {
    pub fn parse(doc: &Document) -> Result<Stage> {
        let Some((op, arg)) = doc.single() else {
            return Err(Error::invalid_statement(
                "pipeline stages take exactly one operator",
            ));
        };

        Ok(match op {
            "$match" => Stage::Match(Selector::parse(document(op, arg)?)?),
            "$lookup" => Stage::Lookup(Lookup::parse(document(op, arg)?)?),
            "$addFields" | "$set" => Stage::AddFields(AddFields::parse(document(op, arg)?)?),
            "$project" => Stage::Project(Projection::parse(document(op, arg)?)?),
            "$group" => Stage::Group(Group::parse(document(op, arg)?)?),
            "$sort" => Stage::Sort(Sort::parse(document(op, arg)?)?),
            "$skip" => Stage::Skip(count(op, arg)?),
            "$limit" => Stage::Limit(count(op, arg)?),
            "$count" => match arg {
                Value::String(name) if !name.is_empty() && !name.starts_with('$') => {
                    Stage::Count(name.clone())
                }
                _ => return Err(Error::invalid_statement("$count expects a field name")),
            },
            _ => return Err(Error::not_implemented(format!("pipeline stage {op}"))),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Lookup(_) => "$lookup",
            Stage::AddFields(_) => "$addFields",
            Stage::Project(_) => "$project",
            Stage::Group(_) => "$group",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Count(_) => "$count",
        }
    }
}

fn document<'a>(op: &str, arg: &'a Value) -> Result<&'a Document> {
    arg.as_document()
        .ok_or_else(|| Error::invalid_statement(format!("{op} expects an object")))
}

fn count(op: &str, arg: &Value) -> Result<u64> {
    arg.as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| Error::invalid_statement(format!("{op} expects a non-negative integer")))
}

impl Lookup {
    pub fn parse(doc: &Document) -> Result<Lookup> {
        if doc.contains_key("pipeline") || doc.contains_key("let") {
            return Err(Error::not_implemented("pipeline lookups"));
        }

        let field = |name: &str| match doc.get(name) {
            Some(Value::String(value)) => Ok(value.clone()),
            _ => Err(Error::invalid_statement(format!(
                "$lookup requires a string {name:?}"
            ))),
        };

        Ok(Lookup {
            from: field("from")?,
            local_field: field("localField")?,
            foreign_field: field("foreignField")?,
            as_field: field("as")?,
        })
    }
}

impl AddFields {
    pub fn parse(doc: &Document) -> Result<AddFields> {
        let fields = doc
            .iter()
            .map(|(name, value)| Ok((name.to_string(), Expr::parse(value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(AddFields { fields })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Group {
    pub fn parse(doc: &Document) -> Result<Group> {
        let mut items = vec![];

        for (name, value) in doc.iter() {
            let item = match (is_group_by_aggregate(value)?, value) {
                (true, Value::Document(aggregate)) => {
                    GroupItem::Aggregate(Aggregate::parse(aggregate)?)
                }
                _ => match Expr::parse(value)? {
                    Expr::Literal(Value::Document(_)) => {
                        return Err(Error::not_implemented(format!(
                            "compound group key {name:?}"
                        )))
                    }
                    expr => GroupItem::Key(expr),
                },
            };
            items.push((name.to_string(), item));
        }

        if items.is_empty() {
            return Err(Error::invalid_statement("$group requires at least one field"));
        }

        Ok(Group { items })
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.items.iter().filter_map(|(name, item)| match item {
            GroupItem::Key(expr) => Some((name.as_str(), expr)),
            GroupItem::Aggregate(_) => None,
        })
    }
}

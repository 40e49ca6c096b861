use super::{Document, Expr, Value};
use crate::Result;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Projection {
    pub items: Vec<(String, ProjectionItem)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItem {
    Include,
    Exclude,
    /// A renamed field (`"$c"`) or a computed expression.
    Computed(Expr),
}

impl Projection {
    pub fn parse(doc: &Document) -> Result<Projection> {
        let items = doc
            .iter()
            .map(|(name, value)| {
                let item = match value {
                    Value::Null | Value::Bool(_) | Value::I64(_) | Value::F64(_) => {
                        if value.is_truthy() {
                            ProjectionItem::Include
                        } else {
                            ProjectionItem::Exclude
                        }
                    }
                    other => ProjectionItem::Computed(Expr::parse(other)?),
                };
                Ok((name.to_string(), item))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Projection { items })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A projection is inclusion-style as soon as any field is included.
    pub fn is_inclusion(&self) -> bool {
        self.items
            .iter()
            .any(|(_, item)| matches!(item, ProjectionItem::Include))
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.items
            .iter()
            .any(|(field, item)| field == name && matches!(item, ProjectionItem::Exclude))
    }

    pub fn computed(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.items.iter().filter_map(|(name, item)| match item {
            ProjectionItem::Computed(expr) => Some((name.as_str(), expr)),
            _ => None,
        })
    }
}

use super::{select::SelectParts, SelectOptions, SelectQuery, Source};

use docsql_core::{
    schema::{Schema, Table},
    stmt::{Aggregate, AggregateOp, Document, Group, GroupItem, Stage},
    Result,
};
use std::sync::Arc;

/// An aggregation pipeline over one table.
///
/// Stages fold into as few selects as possible. When a stage cannot be
/// expressed in the select built so far without changing the order stages
/// apply in, that select becomes the source of a new one.
#[derive(Debug, Clone)]
pub struct Pipeline {
    table: Arc<Table>,
    stages: Vec<Stage>,
    schema: Option<Arc<Schema>>,
}

/// The stages folded into one select.
#[derive(Debug, Default)]
struct Unit {
    parts: SelectParts,
    lookup: bool,
    add_fields: bool,
    project: bool,
    group: bool,
    sort: bool,
    skip: bool,
    limit: bool,
    count: bool,
}

impl Pipeline {
    pub fn new(table: &Arc<Table>, stages: &[Document]) -> Result<Pipeline> {
        let stages = stages.iter().map(Stage::parse).collect::<Result<Vec<_>>>()?;
        Ok(Pipeline::from_stages(table, stages))
    }

    pub fn from_stages(table: &Arc<Table>, stages: Vec<Stage>) -> Pipeline {
        Pipeline {
            table: table.clone(),
            stages,
            schema: None,
        }
    }

    /// Resolves `$lookup` collections against `schema`.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Pipeline {
        self.schema = Some(schema);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_query(&self) -> Result<SelectQuery> {
        let mut source = Source::Table(self.table.clone());
        let mut unit = Unit::default();

        for stage in &self.stages {
            if !unit.accepts(stage) {
                let query = SelectQuery::build(source, unit.finish(&self.schema))?;
                source = Source::Subquery(Box::new(query));
                unit = Unit::default();
            }
            unit.add(stage);
        }

        SelectQuery::build(source, unit.finish(&self.schema))
    }
}

impl Unit {
    fn shaped(&self) -> bool {
        self.add_fields || self.project || self.group || self.count
    }

    fn accepts(&self, stage: &Stage) -> bool {
        match stage {
            Stage::Match(_) => !self.shaped() && !self.skip && !self.limit,
            Stage::Lookup(_) => !self.lookup && !self.shaped() && !self.sort && !self.skip && !self.limit,
            Stage::AddFields(_) | Stage::Project(_) => !self.shaped(),
            Stage::Group(_) => !self.shaped() && !self.sort && !self.skip && !self.limit,
            Stage::Sort(_) => !self.sort && !self.skip && !self.limit && !self.count,
            Stage::Skip(_) => !self.skip && !self.limit && !self.count,
            Stage::Limit(_) => !self.limit && !self.count,
            Stage::Count(_) => !self.shaped() && !self.sort && !self.skip && !self.limit,
        }
    }

    fn add(&mut self, stage: &Stage) {
        let parts = &mut self.parts;
        match stage {
            Stage::Match(selector) => {
                parts.selector = std::mem::take(&mut parts.selector).and(selector.clone());
            }
            Stage::Lookup(lookup) => {
                parts.options.lookup = Some(lookup.clone());
                self.lookup = true;
            }
            Stage::AddFields(add_fields) => {
                parts.options.add_fields = add_fields.clone();
                self.add_fields = true;
            }
            Stage::Project(projection) => {
                parts.projection = projection.clone();
                self.project = true;
            }
            Stage::Group(group) => {
                parts.options.group = Some(group.clone());
                self.group = true;
            }
            Stage::Sort(sort) => {
                parts.sort = sort.clone();
                self.sort = true;
            }
            Stage::Skip(skip) => {
                parts.skip = Some(*skip);
                self.skip = true;
            }
            Stage::Limit(limit) => {
                parts.limit = Some(*limit);
                self.limit = true;
            }
            Stage::Count(name) => {
                parts.options.group = Some(Group {
                    items: vec![(
                        name.clone(),
                        GroupItem::Aggregate(Aggregate {
                            op: AggregateOp::Count,
                            arg: None,
                        }),
                    )],
                });
                self.count = true;
            }
        }
    }

    fn finish(self, schema: &Option<Arc<Schema>>) -> SelectParts {
        let mut parts = self.parts;
        parts.options = SelectOptions {
            schema: schema.clone(),
            ..parts.options
        };
        parts
    }
}

mod add_field;
pub use add_field::AddFieldQuery;

mod column_def;

mod create_index;
pub use create_index::CreateIndexQuery;

mod create_table;
pub use create_table::CreateTableQuery;

mod delete;
pub use delete::DeleteQuery;

mod drop_index;
pub use drop_index::DropIndexQuery;

mod insert;
pub use insert::{ConflictStrategy, InsertOptions, InsertQuery, ID_LENGTH};

mod pipeline;
pub use pipeline::Pipeline;

mod select;
pub use select::{SelectOptions, SelectQuery, Source};

mod update;
pub use update::{UpdateQuery, UpdateQueryOptions};

mod update_default_value;
pub use update_default_value::UpdateDefaultValueQuery;

use crate::{
    projection_context::ProjectedQuery,
    query::{Compiled, Query},
};

/// Any statement the execution layer runs.
#[derive(Debug, Clone)]
pub enum Statement {
    AddField(AddFieldQuery),
    CreateIndex(CreateIndexQuery),
    CreateTable(CreateTableQuery),
    Delete(DeleteQuery),
    DropIndex(DropIndexQuery),
    Insert(InsertQuery),
    Projected(ProjectedQuery),
    Select(SelectQuery),
    Update(UpdateQuery),
    UpdateDefaultValue(UpdateDefaultValueQuery),
}

impl Statement {
    /// The builder's name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Statement::AddField(_) => "AddFieldQuery",
            Statement::CreateIndex(_) => "CreateIndexQuery",
            Statement::CreateTable(_) => "CreateTableQuery",
            Statement::Delete(_) => "DeleteQuery",
            Statement::DropIndex(_) => "DropIndexQuery",
            Statement::Insert(_) => "InsertQuery",
            Statement::Projected(_) => "ProjectionContext",
            Statement::Select(_) => "SelectQuery",
            Statement::Update(_) => "UpdateQuery",
            Statement::UpdateDefaultValue(_) => "UpdateDefaultValueQuery",
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::AddField(_)
                | Statement::CreateIndex(_)
                | Statement::CreateTable(_)
                | Statement::DropIndex(_)
                | Statement::UpdateDefaultValue(_)
        )
    }

    pub fn query(&self) -> &Query {
        match self {
            Statement::AddField(stmt) => stmt.query(),
            Statement::CreateIndex(stmt) => stmt.query(),
            Statement::CreateTable(stmt) => stmt.query(),
            Statement::Delete(stmt) => stmt.query(),
            Statement::DropIndex(stmt) => stmt.query(),
            Statement::Insert(stmt) => stmt.query(),
            Statement::Projected(stmt) => stmt.query(),
            Statement::Select(stmt) => stmt.query(),
            Statement::Update(stmt) => stmt.query(),
            Statement::UpdateDefaultValue(stmt) => stmt.query(),
        }
    }

    pub fn compile(&self) -> Compiled {
        match self {
            Statement::Projected(stmt) => stmt.compile(),
            stmt => stmt.query().compile(),
        }
    }
}

impl From<DeleteQuery> for Statement {
    fn from(value: DeleteQuery) -> Self {
        Self::Delete(value)
    }
}

impl From<InsertQuery> for Statement {
    fn from(value: InsertQuery) -> Self {
        Self::Insert(value)
    }
}

impl From<ProjectedQuery> for Statement {
    fn from(value: ProjectedQuery) -> Self {
        Self::Projected(value)
    }
}

impl From<SelectQuery> for Statement {
    fn from(value: SelectQuery) -> Self {
        Self::Select(value)
    }
}

impl From<UpdateQuery> for Statement {
    fn from(value: UpdateQuery) -> Self {
        Self::Update(value)
    }
}

mod bulk;
pub use bulk::BulkOperation;

mod condition;
pub use condition::{Condition, GeoWithin};

mod document;
pub use document::Document;

mod expr;
pub use expr::{is_group_by_aggregate, Aggregate, AggregateOp, BinaryOp, CondTest, Expr};

mod modifier;
pub use modifier::Modifier;

mod options;
pub use options::{FindOptions, RemoveOptions, ReturnCount, UpdateOptions};

mod projection;
pub use projection::{Projection, ProjectionItem};

mod selector;
pub use selector::{Clause, IntoSelector, Selector};

mod sort;
pub use sort::{Direction, Sort};

mod stage;
pub use stage::{AddFields, Group, GroupItem, Lookup, Stage};

mod value;
pub use value::Value;

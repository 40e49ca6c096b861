mod compiler;

mod functions;
pub use functions::ADD_TO_SET_FUNCTION;

mod projection_context;
pub use projection_context::{ProjectedQuery, ProjectionContext};

pub mod query;
pub use query::{Arg, Atom, Compiled, Query};

mod random;
pub use random::random_id;

mod scope;

pub mod serializer;
pub use serializer::Serializer;

pub mod stmt;
pub use stmt::{Pipeline, SelectQuery, Statement};

//! The Node / DataType / Schema kernel: a typed, hierarchical,
//! layout-descriptive container.

pub mod accessor;
pub mod diff;
pub mod dtype;
pub mod schema;
pub mod text;

#[allow(clippy::module_inception)]
mod node;

pub use self::accessor::{Accessor, Scalar, ScalarValue};
pub use self::dtype::{DTypeId, DataType, Endianness};
pub use self::node::Node;
pub use self::schema::Schema;

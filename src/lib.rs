pub mod naive;
pub mod node;
pub mod parse_rle;
pub mod rule_set;
pub mod table;
pub mod universe;

mod evolve;
mod parse_util;

pub use node::NodeId;
pub use table::NodeTable;
pub use universe::Universe;

pub type WorldOffset = i64;

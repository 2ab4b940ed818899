pub mod error;
pub mod node;
pub mod parser;
pub mod tree;

pub use error::{MissingPolicy, TreeError};
pub use node::{AttrValue, Node, NodeId};
pub use tree::Tree;

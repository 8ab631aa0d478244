pub mod call_tree;
pub mod key;

pub use call_tree::{CallGraph, CallTree, MergedNode, NodeIdx, UNKNOWN_LABEL};
pub use key::NodeKey;

#[macro_use(debug)]
extern crate tracing;

pub mod node_state;
pub mod parser;
pub mod search;
pub mod semantics;
pub mod tree;
pub mod tree_state;

#[cfg(feature = "python")]
pub mod python_interface;

//! Front end: scanning template text and building the instruction tree

pub mod ast;
pub mod scanner;
pub mod tree;

pub use ast::*;
pub use scanner::scan;
pub use tree::{parse, SectionTag};

pub mod guard;
pub mod scanner;
pub mod tree;

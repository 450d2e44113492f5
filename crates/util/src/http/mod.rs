pub mod assemblers;
pub mod parser;

pub use assemblers::*;
pub use parser::*;

mod memory_repository;
mod model;

pub use memory_repository::*;
pub use model::*;

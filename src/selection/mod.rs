pub mod difficulty;
pub mod selector;

pub use difficulty::{recommend, Difficulty};
pub use selector::{select_next, SelectionResult};

pub mod history;
pub mod manager;
pub mod types;


pub use history::*;
pub use manager::*;
pub use types::*;

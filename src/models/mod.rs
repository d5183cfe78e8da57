pub mod pairs;
pub mod records;
pub mod stats_models;

pub use pairs::*;
pub use records::*;
pub use stats_models::*;

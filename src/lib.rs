pub mod candidate_generation;
pub mod features;
pub mod gold;
pub mod loaders;
pub mod matching;
pub mod modeling;
pub mod models;
pub mod negatives;
pub mod pipeline;
pub mod utils;

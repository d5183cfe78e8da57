pub mod blocking_index;
pub mod candidate_generation;

pub use blocking_index::{BlockingIndex, BlockingKeyKind};
pub use candidate_generation::{generate_candidates, generate_candidates_for_chunk};

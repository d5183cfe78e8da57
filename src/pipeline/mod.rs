pub mod merge;
pub mod streaming;
pub mod training;

pub use merge::merge_chunk_outputs;
pub use streaming::{chunk_file_name, clear_chunk_outputs, run_streaming_inference, StreamingSettings};
pub use training::{assemble_training_pairs, run_training, TrainingReport, TrainingSettings};

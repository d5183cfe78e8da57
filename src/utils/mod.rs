pub mod env;
pub mod matching_config;
pub mod pipeline_state;
pub mod progress_bars;
pub mod validators;

pub use progress_bars::{logging, progress_config};

/// Resident memory of the whole system in MB, for progress messages.
pub fn get_memory_usage() -> u64 {
    use sysinfo::System;
    let mut sys = System::new_all();
    sys.refresh_memory();
    sys.used_memory() / (1024 * 1024) // Convert to MB
}

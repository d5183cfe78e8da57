// src/utils/progress_bars/logging.rs - Consistent log lines for each pipeline phase
use log::{debug, info, warn};
use std::time::Instant;

/// The pipeline components that log through [`PipelineLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Normalize,
    Blocking,
    Gold,
    Negatives,
    Features,
    Training,
    Streaming,
    Merge,
}

impl PipelinePhase {
    fn label(&self) -> (&'static str, &'static str) {
        match self {
            PipelinePhase::Normalize => ("NORMALIZE", "🧹"),
            PipelinePhase::Blocking => ("BLOCKING", "🧱"),
            PipelinePhase::Gold => ("GOLD", "🥇"),
            PipelinePhase::Negatives => ("NEGATIVES", "➖"),
            PipelinePhase::Features => ("FEATURES", "📐"),
            PipelinePhase::Training => ("TRAINING", "🧠"),
            PipelinePhase::Streaming => ("STREAMING", "🌊"),
            PipelinePhase::Merge => ("MERGE", "🔗"),
        }
    }
}

#[derive(Clone)]
pub struct PipelineLogger {
    phase_name: &'static str,
    phase_emoji: &'static str,
    start_time: Instant,
}

impl PipelineLogger {
    pub fn new(phase: PipelinePhase) -> Self {
        let (phase_name, phase_emoji) = phase.label();
        Self {
            phase_name,
            phase_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, details: &str) {
        info!(
            "[{}] {} 🚀 Starting {} ({})",
            self.phase_name,
            self.phase_emoji,
            self.phase_name.to_lowercase(),
            details
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.phase_name,
                self.phase_emoji,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.phase_name,
                self.phase_emoji,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.phase_name, self.phase_emoji, count, data_type
        );
    }

    pub fn log_count(&self, what: &str, count: usize) {
        info!(
            "[{}] {} 📈 {}: {}",
            self.phase_name, self.phase_emoji, what, count
        );
    }

    pub fn log_completion(&self, summary: &str) {
        info!(
            "[{}] {} 🎉 COMPLETED in {:.2?}: {}",
            self.phase_name,
            self.phase_emoji,
            self.start_time.elapsed(),
            summary
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.phase_name, self.phase_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.phase_name, self.phase_emoji, message);
    }
}

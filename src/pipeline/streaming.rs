// src/pipeline/streaming.rs
//! Chunked scoring of the voter file against a fixed set of attempts.
//!
//! Each voter-file chunk is indexed, joined and scored on its own. Its output
//! file is keyed by chunk index and overwritten on re-runs; the checkpoint is
//! updated only after that file is fully written, so a crash mid-chunk leaves
//! the chunk to be redone on the next run.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::candidate_generation::generate_candidates_for_chunk;
use crate::loaders::load_voterfile::voters_from_frame;
use crate::loaders::{ColumnMap, RecordFrame, RecordSource};
use crate::matching::Normalizer;
use crate::modeling::{predict_chunk, MatchClassifier};
use crate::models::{LabeledPair, NormalizedAttempt, PairOrigin, ScoredPairRow, StreamingSummary};
use crate::utils::get_memory_usage;
use crate::utils::logging::{PipelineLogger, PipelinePhase};
use crate::utils::pipeline_state::CheckpointStore;
use crate::utils::progress_config::ProgressConfig;

pub const CHUNK_FILE_PREFIX: &str = "predicted_matches_chunk_";

pub fn chunk_file_name(chunk_idx: usize) -> String {
    format!("{}{}.csv", CHUNK_FILE_PREFIX, chunk_idx)
}

#[derive(Debug, Clone)]
pub struct StreamingSettings {
    pub output_dir: PathBuf,
    pub column_map: ColumnMap,
    pub progress: ProgressConfig,
}

enum ChunkOutcome {
    Scored(usize),
    NoCandidates,
}

fn score_chunk<C: MatchClassifier>(
    chunk_idx: usize,
    mut frame: RecordFrame,
    attempts: &[NormalizedAttempt],
    classifier: &C,
    normalizer: &Normalizer,
    settings: &StreamingSettings,
) -> Result<ChunkOutcome> {
    settings.column_map.apply_to_voterfile(&mut frame);
    let voters = normalizer.normalize_voters(voters_from_frame(&frame)?);
    let candidates = generate_candidates_for_chunk(attempts, &voters);
    if candidates.is_empty() {
        return Ok(ChunkOutcome::NoCandidates);
    }

    let pairs: Vec<LabeledPair> = candidates
        .iter()
        .map(|c| {
            LabeledPair::from_records(
                &attempts[c.attempt_idx],
                &voters[c.voter_idx],
                PairOrigin::Candidate,
                None,
            )
        })
        .collect();
    let probs = predict_chunk(classifier, &pairs)?;

    let path = settings.output_dir.join(chunk_file_name(chunk_idx));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create chunk file {}", path.display()))?;
    for ((pair, candidate), prob) in pairs.iter().zip(&candidates).zip(&probs) {
        writer
            .serialize(ScoredPairRow::new(pair, &candidate.blocking_key, *prob))
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(ChunkOutcome::Scored(pairs.len()))
}

/// Scores every chunk `source` yields that the checkpoint does not already
/// mark complete. Chunks are numbered from 0 in source order; skipped chunks
/// are still read so that numbering stays stable across runs.
pub async fn run_streaming_inference<S: RecordSource, C: MatchClassifier>(
    attempts: &[NormalizedAttempt],
    source: &mut S,
    classifier: &C,
    normalizer: &Normalizer,
    checkpoint: &mut CheckpointStore,
    settings: &StreamingSettings,
) -> Result<StreamingSummary> {
    let logger = PipelineLogger::new(PipelinePhase::Streaming);
    logger.log_start(&format!(
        "{} attempts against {}",
        attempts.len(),
        source.describe()
    ));
    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create chunk output directory {}",
            settings.output_dir.display()
        )
    })?;

    let pb = settings.progress.phase_bar(0, "Scoring chunks");
    let mut summary = StreamingSummary::default();
    let mut chunk_idx = 0usize;

    while let Some(frame) = source.next_frame().await? {
        pb.inc_length(1);
        summary.chunks_seen += 1;
        summary.voters_read += frame.len();

        if checkpoint.is_complete(chunk_idx) {
            logger.log_debug(&format!("Chunk {} already complete, skipping", chunk_idx));
            summary.chunks_skipped += 1;
        } else {
            let outcome = score_chunk(chunk_idx, frame, attempts, classifier, normalizer, settings)
                .with_context(|| format!("Chunk {} failed", chunk_idx))?;
            match outcome {
                ChunkOutcome::Scored(rows) => {
                    summary.chunks_processed += 1;
                    summary.candidates_scored += rows;
                    logger.log_debug(&format!("Chunk {}: {} candidates scored", chunk_idx, rows));
                }
                ChunkOutcome::NoCandidates => {
                    summary.chunks_without_candidates += 1;
                    logger.log_debug(&format!("Chunk {}: no candidates", chunk_idx));
                }
            }
            checkpoint.mark_complete(chunk_idx)?;
        }

        if settings.progress.should_show_memory() {
            pb.set_message(format!(
                "Scoring chunks (chunk {}, memory {} MB)",
                chunk_idx,
                get_memory_usage()
            ));
        }
        pb.inc(1);
        chunk_idx += 1;
    }
    pb.finish_and_clear();

    logger.log_completion(&format!(
        "{} chunks seen, {} scored, {} skipped, {} without candidates, {} pairs",
        summary.chunks_seen,
        summary.chunks_processed,
        summary.chunks_skipped,
        summary.chunks_without_candidates,
        summary.candidates_scored
    ));
    Ok(summary)
}

/// Removes chunk artifacts left by earlier runs.
pub fn clear_chunk_outputs(output_dir: &Path) -> Result<usize> {
    if !output_dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)
        .with_context(|| format!("Failed to list {}", output_dir.display()))?
    {
        let path = entry?.path();
        let is_chunk = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CHUNK_FILE_PREFIX) && n.ends_with(".csv"));
        if is_chunk {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMatrix;
    use crate::loaders::FrameSource;
    use crate::models::AttemptRecord;
    use std::cell::Cell;

    struct ConstantClassifier(f64);

    impl MatchClassifier for ConstantClassifier {
        fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(vec![self.0; matrix.len()])
        }
    }

    fn attempts() -> Vec<NormalizedAttempt> {
        let normalizer = Normalizer::default();
        normalizer.normalize_attempts(vec![AttemptRecord {
            registration_form_id: "A1".to_string(),
            first_name: Some("Jose".to_string()),
            last_name: Some("Garcia".to_string()),
            date_of_birth: Some("1990-05-01".to_string()),
            zip: Some("33101".to_string()),
            ..Default::default()
        }])
    }

    fn voter_frames() -> Vec<RecordFrame> {
        let columns = ["voter_id", "first_name", "last_name", "date_of_birth", "zip"];
        vec![
            RecordFrame::from_raw(
                &columns,
                &[&["V1", "Jose", "Garcia", "1990-05-01", "33101"]],
            )
            .unwrap(),
            RecordFrame::from_raw(
                &columns,
                &[&["V2", "Ann", "Smith", "1970-01-01", "10001"]],
            )
            .unwrap(),
            RecordFrame::from_raw(
                &columns,
                &[&["V3", "Josie", "Gomez", "1990-02-02", "33102"]],
            )
            .unwrap(),
        ]
    }

    fn settings(dir: &Path) -> StreamingSettings {
        StreamingSettings {
            output_dir: dir.join("chunks"),
            column_map: ColumnMap::default(),
            progress: ProgressConfig::disabled(),
        }
    }

    #[tokio::test]
    async fn test_streaming_writes_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut checkpoint = CheckpointStore::load(dir.path().join("progress.json")).unwrap();
        let mut source = FrameSource::new(voter_frames());

        let summary = run_streaming_inference(
            &attempts(),
            &mut source,
            &ConstantClassifier(0.7),
            &Normalizer::default(),
            &mut checkpoint,
            &settings,
        )
        .await
        .unwrap();

        assert_eq!(summary.chunks_seen, 3);
        assert_eq!(summary.chunks_processed, 2);
        assert_eq!(summary.chunks_without_candidates, 1);
        assert_eq!(summary.candidates_scored, 2);
        assert!(settings.output_dir.join(chunk_file_name(0)).exists());
        assert!(!settings.output_dir.join(chunk_file_name(1)).exists());
        assert!(settings.output_dir.join(chunk_file_name(2)).exists());
        assert_eq!(checkpoint.completed_chunks(), vec![0, 1, 2]);

        let mut reader = csv::Reader::from_path(settings.output_dir.join(chunk_file_name(0))).unwrap();
        let rows: Vec<ScoredPairRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].voter_id, "V1");
        assert_eq!(rows[0].blocking_key, "ln0_year:g:1990");
        assert_eq!(rows[0].match_prob, 0.7);
    }

    /// Scores normally until its `fail_on`-th call, which errors.
    struct FlakyClassifier {
        fail_on: usize,
        calls: Cell<usize>,
    }

    impl MatchClassifier for FlakyClassifier {
        fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == self.fail_on {
                anyhow::bail!("scoring backend unavailable");
            }
            Ok(vec![0.5; matrix.len()])
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_resumes_from_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let checkpoint_path = dir.path().join("progress.json");
        let mut frames = voter_frames();
        frames.push(
            RecordFrame::from_raw(
                &["voter_id", "first_name", "last_name", "date_of_birth", "zip"],
                &[&["V4", "Joe", "Garcia", "1990-05-01", "33101"]],
            )
            .unwrap(),
        );

        // Chunk 0 and chunk 2 reach the classifier; the second call fails.
        let mut checkpoint = CheckpointStore::load(&checkpoint_path).unwrap();
        let flaky = FlakyClassifier {
            fail_on: 1,
            calls: Cell::new(0),
        };
        let err = run_streaming_inference(
            &attempts(),
            &mut FrameSource::new(frames.clone()),
            &flaky,
            &Normalizer::default(),
            &mut checkpoint,
            &settings,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Chunk 2"));

        let after_failure = CheckpointStore::load(&checkpoint_path).unwrap();
        assert_eq!(after_failure.completed_chunks(), vec![0, 1]);
        assert!(settings.output_dir.join(chunk_file_name(0)).exists());
        assert!(!settings.output_dir.join(chunk_file_name(2)).exists());
        assert!(!settings.output_dir.join(chunk_file_name(3)).exists());

        fs::remove_file(settings.output_dir.join(chunk_file_name(0))).unwrap();
        let mut checkpoint = CheckpointStore::load(&checkpoint_path).unwrap();
        let summary = run_streaming_inference(
            &attempts(),
            &mut FrameSource::new(frames),
            &ConstantClassifier(0.6),
            &Normalizer::default(),
            &mut checkpoint,
            &settings,
        )
        .await
        .unwrap();

        assert_eq!(summary.chunks_seen, 4);
        assert_eq!(summary.chunks_skipped, 2);
        assert_eq!(summary.chunks_processed, 2);
        assert!(!settings.output_dir.join(chunk_file_name(0)).exists());
        assert!(settings.output_dir.join(chunk_file_name(2)).exists());
        assert!(settings.output_dir.join(chunk_file_name(3)).exists());
        assert_eq!(checkpoint.completed_chunks(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_clear_chunk_outputs_only_removes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(chunk_file_name(3)), "x").unwrap();
        fs::write(dir.path().join("merged.csv"), "x").unwrap();
        assert_eq!(clear_chunk_outputs(dir.path()).unwrap(), 1);
        assert!(dir.path().join("merged.csv").exists());
        assert_eq!(clear_chunk_outputs(&dir.path().join("missing")).unwrap(), 0);
    }
}

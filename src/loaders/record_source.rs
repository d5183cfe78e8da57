// src/loaders/record_source.rs
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio_postgres::SimpleQueryMessage;

use crate::loaders::db::{connect, PgPool, VoterDbSettings};
use crate::loaders::frame::{clean_cell, RecordFrame};
use crate::utils::matching_config::VoterSourceConfig;

/// Yields a collection as bounded frames. `Ok(None)` means exhausted.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn next_frame(&mut self) -> Result<Option<RecordFrame>>;

    fn describe(&self) -> String;
}

/// Drains `source` into one frame.
pub async fn read_all<S: RecordSource>(source: &mut S) -> Result<RecordFrame> {
    let mut all = RecordFrame::default();
    let mut frames = 0usize;
    while let Some(frame) = source.next_frame().await? {
        frames += 1;
        all.append(frame)
            .with_context(|| format!("Inconsistent columns from {}", source.describe()))?;
    }
    info!(
        "Read {} rows in {} frame(s) from {}",
        all.len(),
        frames,
        source.describe()
    );
    Ok(all)
}

/// Reads a CSV file `chunk_size` rows at a time.
pub struct CsvRecordSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: Vec<String>,
    chunk_size: usize,
    exhausted: bool,
}

impl CsvRecordSource {
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open CSV {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        Ok(Self {
            path,
            reader,
            headers,
            chunk_size: chunk_size.max(1),
            exhausted: false,
        })
    }
}

impl RecordSource for CsvRecordSource {
    async fn next_frame(&mut self) -> Result<Option<RecordFrame>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut frame = RecordFrame::new(self.headers.clone());
        let mut record = csv::StringRecord::new();
        while frame.len() < self.chunk_size {
            let more = self
                .reader
                .read_record(&mut record)
                .with_context(|| format!("Failed to read CSV row from {}", self.path.display()))?;
            if !more {
                self.exhausted = true;
                break;
            }
            frame.push_raw_row(record.iter())?;
        }
        if frame.is_empty() {
            Ok(None)
        } else {
            Ok(Some(frame))
        }
    }

    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }
}

/// Pages through a SQL query with LIMIT/OFFSET, every value read as text.
/// Paging is only stable when the query orders its rows.
pub struct PgRecordSource {
    pool: PgPool,
    sql: String,
    page_size: usize,
    offset: usize,
    exhausted: bool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool, sql: &str, page_size: usize) -> Self {
        let sql = sql.trim().trim_end_matches(';').to_string();
        if !sql.to_lowercase().contains("order by") {
            warn!("Voter-file query has no ORDER BY; chunk boundaries may shift between runs");
        }
        Self {
            pool,
            sql,
            page_size: page_size.max(1),
            offset: 0,
            exhausted: false,
        }
    }

    fn page_query(&self) -> String {
        format!(
            "SELECT * FROM ({}) AS voterfile_page LIMIT {} OFFSET {}",
            self.sql, self.page_size, self.offset
        )
    }
}

impl RecordSource for PgRecordSource {
    async fn next_frame(&mut self) -> Result<Option<RecordFrame>> {
        if self.exhausted {
            return Ok(None);
        }
        let query = self.page_query();
        debug!("Voter-file page query: {}", query);
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for voter-file page")?;
        let messages = conn
            .simple_query(&query)
            .await
            .with_context(|| format!("Voter-file page query failed at offset {}", self.offset))?;

        let mut frame: Option<RecordFrame> = None;
        for message in messages {
            match message {
                SimpleQueryMessage::Row(row) => {
                    let frame = frame.get_or_insert_with(|| {
                        RecordFrame::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                    });
                    let cells = (0..row.len())
                        .map(|i| row.get(i).and_then(clean_cell))
                        .collect();
                    frame.push_row(cells)?;
                }
                _ => {}
            }
        }

        let rows = frame.as_ref().map(RecordFrame::len).unwrap_or(0);
        self.offset += rows;
        if rows < self.page_size {
            self.exhausted = true;
        }
        Ok(frame.filter(|f| !f.is_empty()))
    }

    fn describe(&self) -> String {
        format!("PostgreSQL query `{}`", self.sql)
    }
}

/// In-memory frames, yielded in order.
#[derive(Debug, Default)]
pub struct FrameSource {
    frames: VecDeque<RecordFrame>,
}

impl FrameSource {
    pub fn new(frames: Vec<RecordFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Splits one frame into `chunk_size`-row frames.
    pub fn chunked(frame: &RecordFrame, chunk_size: usize) -> Result<Self> {
        let mut frames = Vec::new();
        for rows in frame.rows().chunks(chunk_size.max(1)) {
            frames.push(RecordFrame::from_rows(frame.columns().to_vec(), rows.to_vec())?);
        }
        Ok(Self::new(frames))
    }
}

impl RecordSource for FrameSource {
    async fn next_frame(&mut self) -> Result<Option<RecordFrame>> {
        Ok(self.frames.pop_front())
    }

    fn describe(&self) -> String {
        format!("{} in-memory frame(s)", self.frames.len())
    }
}

/// The voter-file sources a pipeline run can be pointed at.
pub enum VoterSource {
    Csv(CsvRecordSource),
    Postgres(PgRecordSource),
    Frames(FrameSource),
}

impl VoterSource {
    /// Opens the configured source, connecting to PostgreSQL when no CSV is set.
    pub async fn open(config: &VoterSourceConfig, chunk_size: usize) -> Result<Self> {
        match config {
            VoterSourceConfig::Csv(path) => Ok(VoterSource::Csv(CsvRecordSource::open(path, chunk_size)?)),
            VoterSourceConfig::Postgres { sql } => {
                let pool = connect(&VoterDbSettings::from_env())
                    .await
                    .context("Failed to connect to the voter-file database")?;
                Ok(VoterSource::Postgres(PgRecordSource::new(pool, sql, chunk_size)))
            }
        }
    }
}

impl RecordSource for VoterSource {
    async fn next_frame(&mut self) -> Result<Option<RecordFrame>> {
        match self {
            VoterSource::Csv(source) => source.next_frame().await,
            VoterSource::Postgres(source) => source.next_frame().await,
            VoterSource::Frames(source) => source.next_frame().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            VoterSource::Csv(source) => source.describe(),
            VoterSource::Postgres(source) => source.describe(),
            VoterSource::Frames(source) => source.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &Path, rows: usize) -> PathBuf {
        let path = dir.join("voters.csv");
        let mut body = String::from("voter_id,first_name\n");
        for i in 0..rows {
            body.push_str(&format!("V{},Name{}\n", i, i));
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_csv_source_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), 5);
        let mut source = CsvRecordSource::open(&path, 2).unwrap();

        let mut sizes = Vec::new();
        while let Some(frame) = source.next_frame().await.unwrap() {
            sizes.push(frame.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_all_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), 4);
        let mut source = VoterSource::Csv(CsvRecordSource::open(&path, 3).unwrap());
        let frame = read_all(&mut source).await.unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.value_by_name(3, "voter_id"), Some("V3"));
    }

    #[tokio::test]
    async fn test_frame_source_chunked() {
        let frame = RecordFrame::from_raw(&["voter_id"], &[&["V1"], &["V2"], &["V3"]]).unwrap();
        let mut source = FrameSource::chunked(&frame, 2).unwrap();
        assert_eq!(source.next_frame().await.unwrap().unwrap().len(), 2);
        assert_eq!(source.next_frame().await.unwrap().unwrap().len(), 1);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_csv_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), 0);
        let mut source = CsvRecordSource::open(&path, 10).unwrap();
        assert!(source.next_frame().await.unwrap().is_none());
        let all = read_all(&mut source).await.unwrap();
        assert!(all.is_empty());
    }
}

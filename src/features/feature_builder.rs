// src/features/feature_builder.rs
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};

use crate::loaders::frame::RecordFrame;
use crate::matching::address::{normalize_address, normalize_zip, string_similarity};
use crate::matching::date::{dob_digits, month_day_swapped, parse_dob};
use crate::matching::Normalizer;
use crate::models::{LabeledPair, PairSide};
use crate::utils::logging::{PipelineLogger, PipelinePhase};

pub const FEATURE_COUNT: usize = 10;

/// Column order shared by training and inference.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "fn_similarity",
    "ln_similarity",
    "dob_exact",
    "zip_exact",
    "dob_year_match",
    "dob_month_match",
    "dob_day_match",
    "dob_string_similarity",
    "dob_month_day_swapped",
    "address_similarity",
];

const FRAME_REQUIRED_COLUMNS: &[&str] = &[
    "first_name_att",
    "first_name_vf",
    "last_name_att",
    "last_name_vf",
    "dob_norm_att",
    "dob_norm_vf",
    "zip_norm_att",
    "zip_norm_vf",
];

/// SHA-256 of the ordered column list; persisted models carry it.
pub fn schema_fingerprint(columns: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    pub fn_similarity: f64,
    pub ln_similarity: f64,
    pub dob_exact: f64,
    pub zip_exact: f64,
    pub dob_year_match: f64,
    pub dob_month_match: f64,
    pub dob_day_match: f64,
    pub dob_string_similarity: f64,
    pub dob_month_day_swapped: f64,
    pub address_similarity: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.fn_similarity,
            self.ln_similarity,
            self.dob_exact,
            self.zip_exact,
            self.dob_year_match,
            self.dob_month_match,
            self.dob_day_match,
            self.dob_string_similarity,
            self.dob_month_day_swapped,
            self.address_similarity,
        ]
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn date_features(a: Option<NaiveDate>, b: Option<NaiveDate>) -> (f64, f64, f64, f64, f64, f64) {
    match (a, b) {
        (Some(a), Some(b)) => (
            flag(a == b),
            flag(a.year() == b.year()),
            flag(a.month() == b.month()),
            flag(a.day() == b.day()),
            strsim::normalized_levenshtein(&dob_digits(a), &dob_digits(b)),
            flag(month_day_swapped(a, b)),
        ),
        _ => (0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    }
}

/// Feature vector for one pair. Pure: equal inputs give bit-identical output.
pub fn extract_features(attempt: &PairSide, voter: &PairSide) -> FeatureVector {
    let (dob_exact, dob_year_match, dob_month_match, dob_day_match, dob_string_similarity, swapped) =
        date_features(attempt.dob, voter.dob);

    FeatureVector {
        fn_similarity: string_similarity(&attempt.first_name, &voter.first_name),
        ln_similarity: string_similarity(&attempt.last_name, &voter.last_name),
        dob_exact,
        zip_exact: flag(!attempt.zip.is_empty() && attempt.zip == voter.zip),
        dob_year_match,
        dob_month_match,
        dob_day_match,
        dob_string_similarity,
        dob_month_day_swapped: swapped,
        address_similarity: string_similarity(&attempt.address, &voter.address),
    }
}

/// Row-major feature values with the column list they were built for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    pub rows: Vec<[f64; FEATURE_COUNT]>,
}

impl FeatureMatrix {
    pub fn columns(&self) -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_2d_vec(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.to_vec()).collect()
    }

    /// Subset of rows, in the order given.
    pub fn select(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
        }
    }

    pub fn write_csv<W: std::io::Write>(&self, labels: Option<&[u8]>, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = FEATURE_COLUMNS.to_vec();
        if labels.is_some() {
            header.push("is_match");
        }
        wtr.write_record(&header)?;
        for (i, row) in self.rows.iter().enumerate() {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            if let Some(labels) = labels {
                record.push(labels[i].to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Features for every pair, plus the labels when every pair carries one.
pub fn build_feature_matrix(pairs: &[LabeledPair]) -> (FeatureMatrix, Option<Vec<u8>>) {
    let rows = pairs
        .iter()
        .map(|p| extract_features(&p.attempt, &p.voter).to_array())
        .collect();
    let labels: Option<Vec<u8>> = pairs.iter().map(|p| p.is_match).collect();
    (FeatureMatrix { rows }, labels)
}

fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(1),
        "0" | "0.0" | "false" => Some(0),
        _ => None,
    }
}

/// Batch entry point over a pair frame. Validates the required columns
/// (failing before any computation), re-normalizes names, then computes one
/// vector per row. Labels are returned when an `is_match` column is present.
pub fn build_features_from_frame(
    frame: &RecordFrame,
    normalizer: &Normalizer,
) -> Result<(FeatureMatrix, Option<Vec<u8>>)> {
    frame.require(FRAME_REQUIRED_COLUMNS, "pair frame")?;
    let logger = PipelineLogger::new(PipelinePhase::Features);
    logger.log_debug(&format!("Building features for {} pair rows", frame.len()));

    let col = |name: &str| frame.column_index(name);
    let (fn_att, fn_vf, ln_att, ln_vf) = (
        col("first_name_att"),
        col("first_name_vf"),
        col("last_name_att"),
        col("last_name_vf"),
    );
    let (dob_att, dob_vf, zip_att, zip_vf) = (
        col("dob_norm_att"),
        col("dob_norm_vf"),
        col("zip_norm_att"),
        col("zip_norm_vf"),
    );
    let (addr_att, addr_vf, label_col) = (col("address_att"), col("address_vf"), col("is_match"));

    type Col = Option<usize>;
    let side = |row: usize, first: Col, last: Col, dob: Col, zip: Col, addr: Col| PairSide {
        first_name: normalizer.given_name(frame.value(row, first)).unwrap_or_default(),
        last_name: normalizer.surname(frame.value(row, last)).unwrap_or_default(),
        dob: parse_dob(frame.value(row, dob)),
        zip: normalize_zip(frame.value(row, zip)),
        address: normalize_address(frame.value(row, addr)),
    };

    let mut matrix = FeatureMatrix::default();
    let mut labels = label_col.map(|_| Vec::with_capacity(frame.len()));
    for row in 0..frame.len() {
        let attempt = side(row, fn_att, ln_att, dob_att, zip_att, addr_att);
        let voter = side(row, fn_vf, ln_vf, dob_vf, zip_vf, addr_vf);
        matrix.rows.push(extract_features(&attempt, &voter).to_array());

        if let Some(labels) = labels.as_mut() {
            let raw = frame.value(row, label_col).unwrap_or_default();
            match parse_label(raw) {
                Some(label) => labels.push(label),
                None => bail!("Row {} has an invalid is_match value {:?}", row, raw),
            }
        }
    }
    logger.log_count("Feature rows", matrix.len());
    Ok((matrix, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(first: &str, last: &str, dob: Option<(i32, u32, u32)>, zip: &str, address: &str) -> PairSide {
        PairSide {
            first_name: first.to_string(),
            last_name: last.to_string(),
            dob: dob.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            zip: zip.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn test_identical_pair() {
        let a = side("jose", "garcia", Some((1990, 5, 1)), "33101", "100 main street");
        let v = extract_features(&a, &a.clone());
        assert_eq!(v.to_array(), [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_month_day_swap() {
        let a = side("jose", "garcia", Some((1990, 5, 1)), "33101", "");
        let b = side("jose", "garcia", Some((1990, 1, 5)), "33101", "");
        let v = extract_features(&a, &b);
        assert_eq!(v.dob_month_day_swapped, 1.0);
        assert_eq!(v.dob_exact, 0.0);
        assert_eq!(v.dob_year_match, 1.0);
        assert_eq!(v.dob_month_match, 0.0);
        // 19900501 vs 19900105: two substitutions out of eight.
        assert!((v.dob_string_similarity - 0.75).abs() < 1e-12);
        assert_eq!(v.address_similarity, 1.0);
    }

    #[test]
    fn test_missing_values_score_zero() {
        let a = side("", "garcia", None, "", "");
        let b = side("jose", "garcia", Some((1990, 1, 5)), "", "1 ocean drive");
        let v = extract_features(&a, &b);
        assert_eq!(v.fn_similarity, 0.0);
        assert_eq!(v.dob_exact, 0.0);
        assert_eq!(v.dob_year_match, 0.0);
        assert_eq!(v.dob_string_similarity, 0.0);
        assert_eq!(v.dob_month_day_swapped, 0.0);
        assert_eq!(v.zip_exact, 0.0);
        assert_eq!(v.address_similarity, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let a = side("maria", "lopez", Some((1985, 3, 4)), "33133", "9 ocean drive");
        let b = side("mario", "lopes", Some((1985, 4, 3)), "33133", "9 ocean dr");
        let first = extract_features(&a, &b).to_array();
        let second = extract_features(&a, &b).to_array();
        assert_eq!(
            first.map(f64::to_bits),
            second.map(f64::to_bits)
        );
    }

    #[test]
    fn test_frame_entry_point() {
        let frame = RecordFrame::from_raw(
            &[
                "first_name_att", "first_name_vf", "last_name_att", "last_name_vf",
                "dob_norm_att", "dob_norm_vf", "zip_norm_att", "zip_norm_vf", "is_match",
            ],
            &[
                &["Bill", "William", "Núñez", "nunez", "1990-05-01", "1990-05-01", "33101", "33101", "1"],
                &["Ana", "Eva", "Lopez", "Perez", "1990-05-01", "bad", "33101", "", "0"],
            ],
        )
        .unwrap();
        let (matrix, labels) = build_features_from_frame(&frame, &Normalizer::default()).unwrap();
        assert_eq!(labels, Some(vec![1, 0]));
        assert_eq!(matrix.rows[0][0], 1.0);
        assert_eq!(matrix.rows[0][1], 1.0);
        assert_eq!(matrix.rows[1][2], 0.0);
        // Missing address columns compare as two empty strings.
        assert_eq!(matrix.rows[0][9], 1.0);
    }

    #[test]
    fn test_frame_without_labels_and_missing_columns() {
        let frame = RecordFrame::from_raw(
            &["first_name_att", "first_name_vf", "last_name_att", "last_name_vf",
              "dob_norm_att", "dob_norm_vf", "zip_norm_att", "zip_norm_vf"],
            &[&["a", "b", "c", "d", "", "", "", ""]],
        )
        .unwrap();
        let (_, labels) = build_features_from_frame(&frame, &Normalizer::default()).unwrap();
        assert!(labels.is_none());

        let partial = RecordFrame::from_raw(&["first_name_att", "zip_norm_vf"], &[]).unwrap();
        let err = build_features_from_frame(&partial, &Normalizer::default()).unwrap_err();
        assert!(err.to_string().contains("pair frame"));
        assert!(err.to_string().contains("last_name_vf"));
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let forward = schema_fingerprint(&FEATURE_COLUMNS);
        let mut reversed = FEATURE_COLUMNS;
        reversed.reverse();
        assert_ne!(forward, schema_fingerprint(&reversed));
        assert_eq!(forward.len(), 64);
    }
}

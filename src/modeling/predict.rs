// src/modeling/predict.rs
use anyhow::{bail, Result};

use crate::features::build_feature_matrix;
use crate::modeling::MatchClassifier;
use crate::models::LabeledPair;

/// Match probability for each pair, in input order.
pub fn predict_chunk<C: MatchClassifier>(classifier: &C, pairs: &[LabeledPair]) -> Result<Vec<f64>> {
    let (matrix, _) = build_feature_matrix(pairs);
    let probs = classifier.predict_proba(&matrix)?;
    if probs.len() != pairs.len() {
        bail!(
            "Classifier returned {} probabilities for {} pairs",
            probs.len(),
            pairs.len()
        );
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureMatrix, FEATURE_COUNT};
    use crate::models::{PairOrigin, PairSide};

    struct FirstNameOnly;

    impl MatchClassifier for FirstNameOnly {
        fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(matrix.rows.iter().map(|r: &[f64; FEATURE_COUNT]| r[0]).collect())
        }
    }

    fn pair(first_vf: &str) -> LabeledPair {
        LabeledPair {
            registration_form_id: "A1".to_string(),
            voter_id: first_vf.to_string(),
            attempt: PairSide {
                first_name: "jose".to_string(),
                ..Default::default()
            },
            voter: PairSide {
                first_name: first_vf.to_string(),
                ..Default::default()
            },
            is_match: None,
            origin: PairOrigin::Candidate,
        }
    }

    #[test]
    fn test_predict_chunk_order() {
        let probs = predict_chunk(&FirstNameOnly, &[pair("jose"), pair("zzzz")]).unwrap();
        assert_eq!(probs[0], 1.0);
        assert_eq!(probs[1], 0.0);
    }
}

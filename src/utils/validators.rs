// src/utils/validators.rs
use thiserror::Error;

/// Input-shape failures. These are always fatal for the run that hits them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{collection} is missing required columns: {missing:?}")]
    MissingColumns {
        collection: String,
        missing: Vec<String>,
    },

    #[error("model was trained on feature columns {expected:?} but the running schema is {actual:?}")]
    ModelSchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Checks that every name in `needed` is one of `columns`.
pub fn require_columns<S: AsRef<str>>(
    columns: &[S],
    needed: &[&str],
    collection: &str,
) -> Result<(), ValidationError> {
    let missing: Vec<String> = needed
        .iter()
        .filter(|n| !columns.iter().any(|c| c.as_ref() == **n))
        .map(|n| n.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns {
            collection: collection.to_string(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_ok() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert!(require_columns(&cols, &["a", "b"], "frame").is_ok());
    }

    #[test]
    fn test_require_columns_names_collection_and_missing() {
        let cols = vec!["a".to_string()];
        let err = require_columns(&cols, &["a", "b", "c"], "voterfile").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns {
                collection: "voterfile".to_string(),
                missing: vec!["b".to_string(), "c".to_string()],
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("voterfile"));
        assert!(msg.contains("\"b\""));
    }
}

pub mod feature_builder;

pub use feature_builder::{
    build_feature_matrix, build_features_from_frame, extract_features, schema_fingerprint,
    FeatureMatrix, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT,
};

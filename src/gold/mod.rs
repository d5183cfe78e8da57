pub mod gold_pairs;

pub use gold_pairs::{mine_gold_pairs, GoldAuditRow, GoldConfig, GoldLabelPolicy, GoldPairs};

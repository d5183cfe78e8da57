// src/candidate_generation/blocking_index.rs
use std::collections::HashMap;

use crate::models::{BlockingKey, Keyed, NormalizedKey};

/// The families of blocking keys an index can be built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingKeyKind {
    SurnameInitialYear,
    Zip,
    Dob,
    Initials,
    SurnamePhonetic,
    GivenNamePhonetic,
}

impl BlockingKeyKind {
    pub const ALL: [BlockingKeyKind; 6] = [
        BlockingKeyKind::SurnameInitialYear,
        BlockingKeyKind::Zip,
        BlockingKeyKind::Dob,
        BlockingKeyKind::Initials,
        BlockingKeyKind::SurnamePhonetic,
        BlockingKeyKind::GivenNamePhonetic,
    ];

    /// The key of this kind for `key`, or `None` when a component is missing.
    /// Records without a key are simply not indexed under that kind.
    pub fn key_for(&self, key: &NormalizedKey) -> Option<BlockingKey> {
        match self {
            BlockingKeyKind::SurnameInitialYear => {
                Some(BlockingKey::SurnameInitialYear(key.last_initial?, key.birth_year?))
            }
            BlockingKeyKind::Zip => {
                (!key.zip.is_empty()).then(|| BlockingKey::Zip(key.zip.clone()))
            }
            BlockingKeyKind::Dob => key.dob.map(BlockingKey::Dob),
            BlockingKeyKind::Initials => {
                Some(BlockingKey::Initials(key.first_initial?, key.last_initial?))
            }
            BlockingKeyKind::SurnamePhonetic => (!key.last_phonetic.is_empty())
                .then(|| BlockingKey::SurnamePhonetic(key.last_phonetic.clone())),
            BlockingKeyKind::GivenNamePhonetic => (!key.first_phonetic.is_empty())
                .then(|| BlockingKey::GivenNamePhonetic(key.first_phonetic.clone())),
        }
    }
}

/// Maps blocking keys to positions in the collection the index was built
/// from. Built once per collection (or voter-file chunk) in a single pass.
#[derive(Debug, Clone, Default)]
pub struct BlockingIndex {
    buckets: HashMap<BlockingKey, Vec<usize>>,
    record_count: usize,
}

impl BlockingIndex {
    pub fn build<T: Keyed>(records: &[T], kinds: &[BlockingKeyKind]) -> Self {
        let mut buckets: HashMap<BlockingKey, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            for kind in kinds {
                if let Some(key) = kind.key_for(record.key()) {
                    buckets.entry(key).or_default().push(idx);
                }
            }
        }
        Self {
            buckets,
            record_count: records.len(),
        }
    }

    pub fn build_all<T: Keyed>(records: &[T]) -> Self {
        Self::build(records, &BlockingKeyKind::ALL)
    }

    /// Members under `key` in collection order; empty when the key is unknown.
    pub fn lookup(&self, key: &BlockingKey) -> &[usize] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lookup_for(&self, kind: BlockingKeyKind, key: &NormalizedKey) -> &[usize] {
        match kind.key_for(key) {
            Some(blocking_key) => self.lookup(&blocking_key),
            None => &[],
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn largest_bucket(&self) -> usize {
        self.buckets.values().map(Vec::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Normalizer;
    use crate::models::{NormalizedVoter, VoterFileRecord};
    use chrono::NaiveDate;

    fn voter(id: &str, first: &str, last: &str, dob: &str, zip: &str) -> NormalizedVoter {
        Normalizer::default().normalize_voter(VoterFileRecord {
            voter_id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            zip: Some(zip.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_buckets_by_kind() {
        let voters = vec![
            voter("V1", "Jose", "Garcia", "1990-05-01", "33101"),
            voter("V2", "Juan", "Gomez", "1990-07-04", "33101"),
            voter("V3", "Ana", "Garsia", "1985-01-01", "33133"),
        ];
        let index = BlockingIndex::build_all(&voters);

        assert_eq!(index.record_count(), 3);
        assert_eq!(index.lookup(&BlockingKey::SurnameInitialYear('g', 1990)), &[0, 1]);
        assert_eq!(index.lookup(&BlockingKey::Zip("33101".to_string())), &[0, 1]);
        assert_eq!(
            index.lookup(&BlockingKey::Dob(NaiveDate::from_ymd_opt(1985, 1, 1).unwrap())),
            &[2]
        );
        assert_eq!(index.lookup(&BlockingKey::Initials('j', 'g')), &[0, 1]);
        assert_eq!(index.lookup(&BlockingKey::SurnamePhonetic("G620".to_string())), &[0, 2]);
    }

    #[test]
    fn test_missing_bucket_is_empty() {
        let voters = vec![voter("V1", "Jose", "Garcia", "1990-05-01", "33101")];
        let index = BlockingIndex::build(&voters, &[BlockingKeyKind::Zip]);
        assert!(index.lookup(&BlockingKey::Zip("99999".to_string())).is_empty());
        assert!(index.lookup(&BlockingKey::Initials('j', 'g')).is_empty());
        assert_eq!(index.bucket_count(), 1);
    }

    #[test]
    fn test_records_without_components_are_not_indexed() {
        let voters = vec![voter("V1", "", "", "bad date", "")];
        let index = BlockingIndex::build_all(&voters);
        assert_eq!(index.bucket_count(), 0);
        assert_eq!(index.largest_bucket(), 0);
    }
}

// src/matching/name.rs
use anyhow::{Context, Result};
use log::{info, warn};
use rphonetic::{Encoder, Soundex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const DEFAULT_NICKNAMES: &[(&str, &str)] = &[
    ("bill", "william"),
    ("will", "william"),
    ("billy", "william"),
    ("liz", "elizabeth"),
    ("beth", "elizabeth"),
    ("lizzy", "elizabeth"),
    ("joe", "joseph"),
    ("pepe", "joseph"),
];

const DEFAULT_SURNAME_VARIANTS: &[(&str, &str)] = &[("smith-jones", "smith"), ("jones-smith", "smith")];

#[derive(Debug, Deserialize)]
struct NameTablesFile {
    #[serde(default)]
    nicknames: HashMap<String, String>,
    #[serde(default)]
    surnames: HashMap<String, String>,
}

/// Alias tables for given names and surnames.
///
/// Keys and values are folded on construction and alias chains are resolved to
/// their final canonical name, so a canonical name is never itself an alias.
/// That keeps [`NameTables::canonical_given_name`] idempotent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameTables {
    nicknames: HashMap<String, String>,
    surnames: HashMap<String, String>,
}

impl Default for NameTables {
    fn default() -> Self {
        Self::new(
            to_map(DEFAULT_NICKNAMES),
            to_map(DEFAULT_SURNAME_VARIANTS),
        )
    }
}

impl NameTables {
    pub fn new(nicknames: HashMap<String, String>, surnames: HashMap<String, String>) -> Self {
        Self {
            nicknames: resolve_aliases(nicknames, "nickname"),
            surnames: resolve_aliases(surnames, "surname"),
        }
    }

    /// Loads `{"nicknames": {...}, "surnames": {...}}`. A missing section is empty.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read name tables from {}", path.display()))?;
        let parsed: NameTablesFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid name tables file {}", path.display()))?;
        Ok(Self::new(parsed.nicknames, parsed.surnames))
    }

    /// Built-in tables unless `NAME_TABLES_PATH` names a replacement file.
    pub fn from_env() -> Result<Self> {
        match env::var("NAME_TABLES_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let tables = Self::from_json_file(&path)?;
                info!(
                    "Loaded name tables from {} ({} nicknames, {} surname variants)",
                    path,
                    tables.nicknames.len(),
                    tables.surnames.len()
                );
                Ok(tables)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn canonical_given_name(&self, folded: &str) -> String {
        self.nicknames
            .get(folded)
            .cloned()
            .unwrap_or_else(|| folded.to_string())
    }

    pub fn canonical_surname(&self, folded: &str) -> String {
        self.surnames
            .get(folded)
            .cloned()
            .unwrap_or_else(|| folded.to_string())
    }

    pub fn nickname_count(&self) -> usize {
        self.nicknames.len()
    }

    pub fn surname_count(&self) -> usize {
        self.surnames.len()
    }
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn resolve_aliases(raw: HashMap<String, String>, table: &str) -> HashMap<String, String> {
    let folded: HashMap<String, String> = raw
        .into_iter()
        .map(|(k, v)| (fold_text(&k), fold_text(&v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty() && k != v)
        .collect();

    let mut resolved = HashMap::with_capacity(folded.len());
    for alias in folded.keys() {
        let mut current = alias;
        let mut steps = 0;
        while let Some(next) = folded.get(current) {
            current = next;
            steps += 1;
            if current == alias || steps > folded.len() {
                break;
            }
        }
        if current == alias || folded.contains_key(current) {
            warn!("Dropping cyclic {} alias '{}'", table, alias);
            continue;
        }
        resolved.insert(alias.clone(), current.clone());
    }
    resolved
}

/// Lower-cases, strips diacritics and collapses whitespace.
pub fn fold_text(raw: &str) -> String {
    let once = strip_marks(&raw.to_lowercase());
    // Lower-casing can introduce new combining marks (e.g. dotted capital I).
    let twice = strip_marks(&once.to_lowercase());
    twice.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_marks(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Given name: folded then mapped through the nickname table. Missing input stays missing.
pub fn normalize_given_name(raw: Option<&str>, tables: &NameTables) -> Option<String> {
    raw.map(|name| tables.canonical_given_name(&fold_text(name)))
}

pub fn normalize_surname(raw: Option<&str>, tables: &NameTables) -> Option<String> {
    raw.map(|name| tables.canonical_surname(&fold_text(name)))
}

/// Soundex of the ASCII letters in `name`; empty when there are none.
pub fn phonetic_code(name: &str) -> String {
    let letters: String = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return String::new();
    }
    Soundex::default().encode(&letters)
}

pub fn first_letter(name: &str) -> Option<char> {
    name.trim().chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_are_folded() {
        let tables = NameTables::default();
        assert_eq!(normalize_given_name(Some("José"), &tables), Some("jose".to_string()));
        assert_eq!(normalize_surname(Some("  Núñez  "), &tables), Some("nunez".to_string()));
        assert_eq!(fold_text("María   José"), "maria jose");
    }

    #[test]
    fn test_nicknames_and_surname_variants() {
        let tables = NameTables::default();
        assert_eq!(normalize_given_name(Some("Bill"), &tables), Some("william".to_string()));
        assert_eq!(normalize_given_name(Some("LIZZY"), &tables), Some("elizabeth".to_string()));
        assert_eq!(normalize_surname(Some("Jones-Smith"), &tables), Some("smith".to_string()));
        // Nicknames only apply to given names.
        assert_eq!(normalize_surname(Some("Bill"), &tables), Some("bill".to_string()));
    }

    #[test]
    fn test_missing_passes_through() {
        let tables = NameTables::default();
        assert_eq!(normalize_given_name(None, &tables), None);
        assert_eq!(normalize_surname(Some(""), &tables), Some(String::new()));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let tables = NameTables::default();
        for raw in ["José", "Bill", "  ÉLODIE  marie", "Smith-Jones", "İbrahim", ""] {
            let once = normalize_given_name(Some(raw), &tables);
            let twice = normalize_given_name(once.as_deref(), &tables);
            assert_eq!(once, twice, "given name {:?}", raw);

            let once = normalize_surname(Some(raw), &tables);
            let twice = normalize_surname(once.as_deref(), &tables);
            assert_eq!(once, twice, "surname {:?}", raw);
        }
    }

    #[test]
    fn test_alias_chains_resolve_and_cycles_drop() {
        let mut nicknames = HashMap::new();
        nicknames.insert("billy".to_string(), "bill".to_string());
        nicknames.insert("bill".to_string(), "William".to_string());
        nicknames.insert("a".to_string(), "b".to_string());
        nicknames.insert("b".to_string(), "a".to_string());
        let tables = NameTables::new(nicknames, HashMap::new());

        assert_eq!(tables.canonical_given_name("billy"), "william");
        assert_eq!(tables.canonical_given_name("bill"), "william");
        assert_eq!(tables.canonical_given_name("a"), "a");
        assert_eq!(tables.nickname_count(), 2);
    }

    #[test]
    fn test_tables_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        fs::write(&path, r#"{"nicknames": {"Pepe": "José"}}"#).unwrap();
        let tables = NameTables::from_json_file(&path).unwrap();
        assert_eq!(normalize_given_name(Some("pepe"), &tables), Some("jose".to_string()));
        assert_eq!(tables.surname_count(), 0);
    }

    #[test]
    fn test_phonetic_code() {
        assert_eq!(phonetic_code("robert"), "R163");
        assert_eq!(phonetic_code("rupert"), "R163");
        assert_eq!(phonetic_code("o'brien"), phonetic_code("obrien"));
        assert_eq!(phonetic_code(""), "");
        assert_eq!(phonetic_code("123"), "");
    }
}

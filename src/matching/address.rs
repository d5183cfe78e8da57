// src/matching/address.rs
use once_cell::sync::Lazy;
use regex::Regex;

use crate::matching::name::fold_text;

static NON_ADDRESS_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9# ]+").unwrap());

const ZIP_LEN: usize = 5;

/// Digits only, first five kept; shorter codes are left-padded with zeros
/// (spreadsheet exports drop leading zeros). No digits gives an empty code.
pub fn normalize_zip(raw: Option<&str>) -> String {
    let digits: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(ZIP_LEN)
        .collect();
    if digits.is_empty() {
        digits
    } else {
        format!("{:0>width$}", digits, width = ZIP_LEN)
    }
}

fn expand_token(token: &str) -> &str {
    match token {
        "st" | "str" => "street",
        "rd" => "road",
        "ave" | "av" => "avenue",
        "blvd" | "blv" => "boulevard",
        "dr" => "drive",
        "ln" => "lane",
        "ct" => "court",
        "pl" => "place",
        "sq" => "square",
        "pkwy" => "parkway",
        "cir" => "circle",
        "ter" => "terrace",
        "hwy" => "highway",
        "n" => "north",
        "s" => "south",
        "e" => "east",
        "w" => "west",
        "ne" => "northeast",
        "nw" => "northwest",
        "se" => "southeast",
        "sw" => "southwest",
        "apt" => "apartment",
        "ste" => "suite",
        other => other,
    }
}

/// Folded, punctuation-free primary address line with street suffixes and
/// directionals spelled out. Missing input gives an empty string.
pub fn normalize_address(raw: Option<&str>) -> String {
    let folded = fold_text(raw.unwrap_or_default());
    let cleaned = NON_ADDRESS_CHARS.replace_all(&folded, " ");
    cleaned
        .split_whitespace()
        .map(expand_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaro-Winkler similarity in [0, 1]. Two empty strings are identical (1.0);
/// one empty side scores 0.0.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(a, b)
}

// src/loaders/load_voterfile.rs
use anyhow::Result;
use log::warn;

use crate::loaders::column_map::internal;
use crate::loaders::frame::RecordFrame;
use crate::models::VoterFileRecord;

pub const VOTERFILE_REQUIRED_COLUMNS: &[&str] = &[
    internal::VOTER_ID,
    internal::FIRST_NAME,
    internal::LAST_NAME,
    internal::DATE_OF_BIRTH,
    internal::ZIP,
];

/// Typed voters from a frame already renamed to internal columns.
pub fn voters_from_frame(frame: &RecordFrame) -> Result<Vec<VoterFileRecord>> {
    frame.require(VOTERFILE_REQUIRED_COLUMNS, "voterfile")?;

    let col = |name: &str| frame.column_index(name);
    let id = col(internal::VOTER_ID);
    let text = |row: usize, name: &str| frame.value(row, col(name)).map(str::to_string);

    let mut voters = Vec::with_capacity(frame.len());
    let mut without_id = 0usize;
    for row in 0..frame.len() {
        let Some(voter_id) = frame.value(row, id).map(str::to_string) else {
            without_id += 1;
            continue;
        };
        voters.push(VoterFileRecord {
            voter_id,
            first_name: text(row, internal::FIRST_NAME),
            middle_name: text(row, internal::MIDDLE_NAME),
            last_name: text(row, internal::LAST_NAME),
            suffix: text(row, internal::SUFFIX),
            date_of_birth: text(row, internal::DATE_OF_BIRTH),
            address_line_1: text(row, internal::ADDRESS_LINE_1),
            address_line_2: text(row, internal::ADDRESS_LINE_2),
            zip: text(row, internal::ZIP),
        });
    }
    if without_id > 0 {
        warn!("Skipped {} voter row(s) without voter_id", without_id);
    }
    Ok(voters)
}

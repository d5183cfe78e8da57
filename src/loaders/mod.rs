pub mod column_map;
pub mod db;
pub mod frame;
pub mod load_attempts;
pub mod load_voterfile;
pub mod record_source;

pub use column_map::ColumnMap;
pub use frame::RecordFrame;
pub use record_source::{read_all, CsvRecordSource, FrameSource, RecordSource, VoterSource};

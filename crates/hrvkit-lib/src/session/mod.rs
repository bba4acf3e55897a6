pub mod baseline;
pub mod classify;
pub mod records;
pub mod store;
pub mod timestamp;
pub mod window;

pub use classify::{FileMarkers, SessionFileKind};
pub use records::{AffectRecord, HrvRecord, MergedRecord, RecordKind, Row};
pub use store::{merge, SessionStore};
pub use timestamp::{Timestamp, TimestampParser};
pub use window::{compare_windows, TimeWindow, WindowComparison};

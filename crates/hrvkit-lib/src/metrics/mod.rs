pub mod hrv;
pub mod stats;

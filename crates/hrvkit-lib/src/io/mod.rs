pub mod csv;
pub mod heart_rate;
pub mod text;

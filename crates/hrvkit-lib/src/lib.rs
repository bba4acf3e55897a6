pub mod config;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod session;
pub mod signal;
pub mod stream;

pub use metrics::*;
pub use signal::*;
pub use stream::*;

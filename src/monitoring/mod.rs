pub mod stats_sink;

pub use stats_sink::*;

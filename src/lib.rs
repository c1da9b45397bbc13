pub mod api;
pub mod common;
pub mod configs;
pub mod monitoring;
pub mod session;
pub mod sources;
pub mod storage;
pub mod transport;

pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod etl;
pub mod logging;
pub mod server;
pub mod storage;

pub mod config;
pub mod db;
pub mod export;
pub mod init;
pub mod log;
pub mod query;
pub mod serve;

pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod parsers;
pub mod storage;
pub mod telegram;
pub mod utils;

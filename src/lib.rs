pub mod admin;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod merge;
pub mod proxy;
pub mod search;

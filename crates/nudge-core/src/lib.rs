pub mod config;
pub mod error;
pub mod messages;
pub mod model;
pub mod parse;
pub mod processor;
pub mod recurrence;
pub mod storage;

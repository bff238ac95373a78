//! Durable state: the append-only result log

pub mod result_log;

pub use result_log::ResultLog;

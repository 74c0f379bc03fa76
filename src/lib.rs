#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod document;
pub mod formats;
pub mod link_log;
pub mod links;
pub mod logging;
pub mod metadata;
pub mod persist;
pub mod telegram;
pub mod update;

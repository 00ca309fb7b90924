pub mod config;
pub mod fetch;
pub mod fields;
pub mod output;
pub mod prepare;
pub mod ranking;
pub mod raw;
pub mod stats;

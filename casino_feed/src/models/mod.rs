pub mod casino;
pub mod entry;
pub mod feed_config;
pub mod raw_row;

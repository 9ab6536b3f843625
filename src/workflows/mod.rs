pub mod downloader;
pub mod filter;
pub mod output;
pub mod select;

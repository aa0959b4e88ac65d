pub mod cli;
pub mod config;
pub mod gdocs;
pub mod global;
pub mod http;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod summarizer;
pub mod transcript;
pub mod zoom;

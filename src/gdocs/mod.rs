//! Google Docs publishing: themes, styled batchUpdate requests and the API
//! client.

pub mod client;
pub mod oauth;
pub mod requests;
pub mod theme;

pub use client::GDocsClient;
pub use requests::{utf16_len, RequestBuilder, StyledOperation, ORIGIN};
pub use theme::{Theme, ThemeKind};

//! OCR collaborator
//!
//! Text recognition is delegated to the Baidu OCR HTTP API. The `OcrEngine`
//! trait is the seam handlers depend on, so tests can substitute a mock.

mod client;
mod types;

pub use client::*;
pub use types::*;

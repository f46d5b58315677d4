//! Domain models shared by the engine and the gateway

mod document;

pub use document::{Document, DocumentMeta, DocumentResponse};

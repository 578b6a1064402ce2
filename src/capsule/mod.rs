pub mod address;
pub mod client;
pub mod fetcher;

pub use address::{normalize, CAPSULE_SCHEME};
pub use client::{CapsuleClient, CapsuleResponse, TlsCapsuleClient};
pub use fetcher::{fetch_document, CapsuleDocument, STATUS_SUCCESS};

// Client library for the Cheddar subscription billing XML API

pub mod classify;
pub mod client;
pub mod config;
pub mod deferred;
pub mod error;
pub mod form;
pub mod node;
pub mod normalize;
pub mod request;
pub mod resources;
pub mod transport;

// Re-export key types for convenience
pub use classify::{classify_document, classify_response};
pub use client::CheddarClient;
pub use config::{ClientConfig, Credentials};
pub use deferred::Deferred;
pub use error::{CheddarError, Result, TransportError};
pub use form::FormData;
pub use node::Node;
pub use normalize::{normalize, Document, COLLECTION_TAGS};
pub use request::{ApiPath, ApiRequest, RequestDescriptor, ResourcePath};
pub use transport::{ReqwestTransport, Transport, TransportResponse};

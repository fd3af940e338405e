pub mod document;
pub mod error;
pub mod fetcher;
pub mod selector;

pub use document::{ElementNode, Node, Paragraph};
pub use error::{Result, ScanError};
pub use fetcher::{Fetcher, HttpFetcher};
pub use selector::{LinkCandidate, LinkSelector};

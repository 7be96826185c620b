//! Error types for the catalog module

use thiserror::Error;

/// Errors that can occur while loading the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("Request to {feed} failed: {message}")]
    RequestFailed {
        /// Feed name
        feed: String,
        message: String,
    },

    /// Feed returned an error response
    #[error("Feed {feed} returned status {status}")]
    ApiError {
        /// Feed name
        feed: String,
        /// HTTP status code
        status: u16,
    },

    /// Failed to parse feed document
    #[error("Failed to parse feed {feed}: {message}")]
    ParseError {
        /// Feed name
        feed: String,
        message: String,
    },

    /// Feed URL could not be used
    #[error("Invalid feed URL '{0}'")]
    InvalidFeed(String),

    /// Every feed loaded but none had any identifiers
    #[error("Catalog is empty")]
    EmptyCatalog,
}

//! Error type shared by every feed operation.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Everything that can go wrong between issuing a feed request and handing
/// back a translated result.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The request could not be sent or the body could not be read.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The feed answered with a non-success HTTP status.
    #[error("feed returned status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The configured endpoint is not a valid URL.
    #[error("invalid feed url '{0}'")]
    InvalidUrl(String),

    /// The response body is not well-formed XML.
    #[error("response is not well-formed XML: {0}")]
    MalformedXml(#[from] roxmltree::Error),

    /// The feed replied with an `<Error>` element instead of data.
    #[error("feed reported an error (should retry: {should_retry}): {message}")]
    Upstream { message: String, should_retry: bool },

    #[error("agency id must not be empty")]
    EmptyAgencyId,

    /// The route is not in the agency's cached route table. Raised before
    /// any request is made.
    #[error("route {route:?} is not served by agency {agency:?}")]
    InvalidRoute { agency: String, route: String },

    /// An element the schema requires an attribute on came back without it.
    #[error("<{element}> is missing required attribute {attribute:?}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// A boolean attribute carried something other than `true`/`false`.
    #[error("attribute {attribute:?} has non-boolean value {value:?}")]
    InvalidBoolean {
        attribute: &'static str,
        value: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The route configuration came back with no stops or directions at all.
    #[error("route configuration for {route:?} is empty")]
    EmptyRouteConfig { route: String },

    /// Predictions were filtered by a route the response does not contain.
    #[error("no predictions for route {route:?} in response")]
    UnknownRouteInResponse { route: String },
}

impl FeedError {
    /// Returns `true` for errors detected locally, before any request left
    /// the process.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FeedError::EmptyAgencyId | FeedError::InvalidRoute { .. } | FeedError::InvalidUrl(_)
        )
    }
}

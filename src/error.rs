//! Error taxonomy shared by adapters, router and bootstrap.

use thiserror::Error;

/// Failure while talking to an upstream feed or API.
///
/// `origin` names the source or endpoint so log lines carry context.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{origin} unavailable: {reason}")]
    UpstreamUnavailable { origin: String, reason: String },
    #[error("{origin} returned a malformed feed: {detail}")]
    MalformedFeed { origin: String, detail: String },
}

impl FetchError {
    pub fn unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::UpstreamUnavailable { origin: origin.into(), reason: reason.to_string() }
    }

    pub fn malformed(origin: impl Into<String>, detail: impl ToString) -> Self {
        FetchError::MalformedFeed { origin: origin.into(), detail: detail.to_string() }
    }
}

/// User input the router could not map to a command.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/*!
Errors raised while querying a source
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} answered with HTTP {status}")]
    Status { source_name: &'static str, status: u16 },

    #[error("could not decode {source_name} response: {message}")]
    Parse {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name} response is not in the expected format: {detail}")]
    UnexpectedFormat {
        source_name: &'static str,
        detail: String,
    },
}

impl SourceError {
    pub(crate) fn parse(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        SourceError::Parse {
            source_name,
            message: err.to_string(),
        }
    }
}

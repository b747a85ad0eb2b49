use thiserror::Error;

pub type SubregResult<T> = Result<T, SubregError>;

#[derive(Error, Debug)]
pub enum SubregError {
    /// The server answered with an error envelope.
    #[error("API error (major: {major}, minor: {minor}): {message}")]
    Api {
        major: i64,
        minor: i64,
        message: String,
    },

    /// The server answered, but the envelope was empty or unusable.
    #[error("Fatal error: empty response envelope")]
    Fatal,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The command exists in the remote catalog but has no client binding.
    #[error("Command not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SubregError {
    fn from(err: reqwest::Error) -> Self {
        SubregError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SubregError {
    fn from(err: serde_json::Error) -> Self {
        SubregError::Parse(err.to_string())
    }
}

impl From<quick_xml::Error> for SubregError {
    fn from(err: quick_xml::Error) -> Self {
        SubregError::Parse(format!("XML decode error: {}", err))
    }
}

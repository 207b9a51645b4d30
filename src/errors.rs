use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    BadArgument(&'static str),

    #[error("No cluster named {0:?} is registered with Rancher")]
    ClusterNotFound(String),

    #[error("Unexpected response content from rancher at {url}: {body}")]
    Shape { url: String, body: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Response from {url} is missing the {field:?} field")]
    MissingKey { url: String, field: &'static str },

    #[error("Kube Error: {0}")]
    Kube(#[source] kube::Error),
}

impl Error {
    /// Whether the watch loop may log this error and move on to the next
    /// event. Failures talking to Rancher only affect the namespace being
    /// reconciled; failures talking to the Kubernetes API server do not have
    /// a well-understood cause and terminate the process instead.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::BadArgument(_)
            | Error::ClusterNotFound(_)
            | Error::Shape { .. }
            | Error::Transport { .. }
            | Error::Status { .. }
            | Error::MissingKey { .. } => true,
            Error::Kube(_) => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

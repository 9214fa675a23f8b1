use thiserror::Error;

/// Error type that carries the process exit code for each failure class
#[derive(Debug, Error)]
pub enum PipeprobeError {
    /// A required credential was not supplied (exit code 2)
    #[error("{what} is required. Provide it via {hint}")]
    MissingCredential { what: String, hint: String },
    /// The REST API rejected the request or returned garbage (exit code 3)
    #[error("Remote request failed: {0}")]
    Remote(String),
    /// The heuristic clicker ran out of candidates (exit code 4)
    #[error("Could not find element: {0}")]
    ElementNotFound(String),
    /// WebDriver connection failed (exit code 5)
    #[error("WebDriver connection failed: {0}")]
    WebDriverFailed(String),
    /// A bounded wait expired where the caller could not continue (exit code 6)
    #[error("Operation timed out: {0}")]
    Timeout(String),
    /// Ctrl-C while waiting (exit code 130)
    #[error("Interrupted")]
    Interrupted,
    /// Generic error (exit code 1)
    #[error(transparent)]
    Other(anyhow::Error),
}

impl PipeprobeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipeprobeError::Other(_) => 1,
            PipeprobeError::MissingCredential { .. } => 2,
            PipeprobeError::Remote(_) => 3,
            PipeprobeError::ElementNotFound(_) => 4,
            PipeprobeError::WebDriverFailed(_) => 5,
            PipeprobeError::Timeout(_) => 6,
            PipeprobeError::Interrupted => 130,
        }
    }

    pub fn missing(what: &str, hint: &str) -> Self {
        PipeprobeError::MissingCredential {
            what: what.to_string(),
            hint: hint.to_string(),
        }
    }
}

impl From<anyhow::Error> for PipeprobeError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<PipeprobeError>() {
            Ok(typed) => return typed,
            Err(err) => err,
        };

        // fantoccini and driver start-up failures arrive untyped
        let msg = format!("{:#}", err);
        if msg.contains("Failed to connect to WebDriver")
            || msg.contains("geckodriver")
            || msg.contains("chromedriver")
        {
            PipeprobeError::WebDriverFailed(msg)
        } else {
            PipeprobeError::Other(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;

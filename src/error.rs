use axum::http::StatusCode;
use thiserror::Error;

/// Input outside the documented domain of a typed boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} is unreachable: {reason}")]
    Unreachable { provider: &'static str, reason: String },

    #[error("{0} was not found")]
    NotFound(String),

    #[error("unexpected response from {provider}: {reason}")]
    BadResponse { provider: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("username is already taken")]
    UsernameTaken,

    #[error("username and password must not be empty")]
    EmptyField,

    #[error("credential file error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failure surfaced by a route handler. Each variant renders its own message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MalformedInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Wrong username or password")]
    BadLogin,

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(ProviderError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::BadLogin => StatusCode::UNAUTHORIZED,
            AppError::Credentials(CredentialError::UsernameTaken) => StatusCode::CONFLICT,
            AppError::Credentials(CredentialError::EmptyField) => StatusCode::BAD_REQUEST,
            AppError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown on the page that submitted the form.
    pub fn user_message(&self) -> String {
        match self {
            AppError::MalformedInput(msg) => msg.clone(),
            AppError::Provider(ProviderError::NotFound(what)) => {
                format!("{} could not be found", what)
            }
            AppError::Provider(ProviderError::Unreachable { provider, .. }) => {
                format!("{} is unavailable right now, try again later", provider)
            }
            AppError::Provider(ProviderError::BadResponse { provider, .. }) => {
                format!("{} returned data we could not read", provider)
            }
            AppError::BadLogin => self.to_string(),
            AppError::Credentials(CredentialError::UsernameTaken) => "Taken username".into(),
            AppError::Credentials(CredentialError::EmptyField) => {
                "Username and password are required".into()
            }
            AppError::Credentials(_) => "Account storage is unavailable".into(),
        }
    }
}

impl From<InvalidArgument> for AppError {
    fn from(_: InvalidArgument) -> Self {
        AppError::MalformedInput("Invalid stock ticker".into())
    }
}

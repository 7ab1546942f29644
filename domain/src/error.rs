//! Error types for the `domain` layer.
use bungie_auth::error::{
    Error as AuthError, ErrorKind as AuthErrorKind, HttpErrorKind, OAuthErrorKind, TokenErrorKind,
};
use service::config::ConfigError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums. The `source` field holds the original error from a lower layer
/// (`bungie-auth`, `reqwest`, `service`). `web` depends on `domain` only and uses
/// the `error_kind`s to pick the HTTP status and the failure page shown to the user.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Auth(AuthFlowErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Session,
    Other(String),
}

/// Enum representing failures of calls to Bungie.net.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    TokenExchange,
    ResourceFetch,
    Other(String),
}

/// Enum representing why the login flow cannot move forward for this user.
#[derive(Debug, PartialEq)]
pub enum AuthFlowErrorKind {
    NotAuthenticated,
    TokenExpired,
    InvalidState,
    AuthorizationDenied(String),
}

impl Error {
    pub fn new(error_kind: DomainErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }

    pub fn auth(kind: AuthFlowErrorKind) -> Self {
        Self::new(DomainErrorKind::Auth(kind))
    }

    pub fn session<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Session),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

// This is where we translate errors from the `bungie-auth` layer to the `domain` layer.
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let error_kind = match &err.error_kind {
            AuthErrorKind::Http(HttpErrorKind::BuilderFailed) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
            AuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            AuthErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
            | AuthErrorKind::OAuth(OAuthErrorKind::InvalidResponse) => {
                DomainErrorKind::External(ExternalErrorKind::TokenExchange)
            }
            AuthErrorKind::OAuth(OAuthErrorKind::InvalidConfiguration) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            AuthErrorKind::Token(TokenErrorKind::Expired) => {
                DomainErrorKind::Auth(AuthFlowErrorKind::TokenExpired)
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

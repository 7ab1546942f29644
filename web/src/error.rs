use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use domain::error::{
    AuthFlowErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};
use domain::FailureReason;

use crate::view;

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Auth(auth_error_kind) => match auth_error_kind {
                AuthFlowErrorKind::NotAuthenticated | AuthFlowErrorKind::TokenExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthFlowErrorKind::InvalidState => StatusCode::BAD_REQUEST,
                AuthFlowErrorKind::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network
                | ExternalErrorKind::TokenExchange
                | ExternalErrorKind::ResourceFetch
                | ExternalErrorKind::Other(_) => StatusCode::BAD_GATEWAY,
            },
            DomainErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Session)
            | DomainErrorKind::Internal(InternalErrorKind::Other(_)) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            _ => FailureReason::from(&self.0).message(),
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {status}: {:?}", self.0);
        } else {
            debug!("Request rejected with {status}: {:?}", self.0.error_kind);
        }
        (status, Html(view::failure(status, &self.message()))).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

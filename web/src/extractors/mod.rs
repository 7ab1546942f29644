pub(crate) mod login_session;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);

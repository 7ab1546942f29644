use domain::Callback;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters Bungie.net appends when redirecting back to `/callback`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code, present when the user approved
    pub code: Option<String>,
    /// CSRF state issued by `/login`
    pub state: Option<String>,
    /// OAuth error code, present when authorization failed
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl From<CallbackParams> for Callback {
    fn from(params: CallbackParams) -> Self {
        Callback {
            code: params.code.filter(|code| !code.is_empty()),
            state: params.state,
            error: params.error.filter(|error| !error.is_empty()),
            error_description: params.error_description,
        }
    }
}

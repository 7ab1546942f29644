//! Loading the signed-in user's profile from Bungie.net.

use crate::error::Error;
use crate::gateway::bungie::PlatformClient;
use crate::login::SessionToken;
use chrono::Utc;
use log::*;
use serde::Serialize;
use serde_json::Value;

/// The fields shown at the top of the profile page.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub display_name: Option<String>,
    pub membership_id: Option<String>,
}

/// A freshly fetched profile. Never cached between requests.
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub summary: ProfileSummary,
    /// The platform payload, as returned.
    pub raw: Value,
}

impl Profile {
    fn from_response(raw: Value, token: &SessionToken) -> Self {
        let user = &raw["bungieNetUser"];
        let display_name = ["bungieGlobalDisplayName", "displayName", "uniqueName"]
            .iter()
            .find_map(|field| user[*field].as_str())
            .map(str::to_string);
        let membership_id = user["membershipId"]
            .as_str()
            .map(str::to_string)
            .or_else(|| token.membership_id.clone());

        Self {
            summary: ProfileSummary {
                display_name,
                membership_id,
            },
            raw,
        }
    }
}

/// Fetches the profile with the session's access token.
///
/// An expired token fails with `TokenExpired` before any request is made.
pub async fn fetch(platform: &PlatformClient, token: &SessionToken) -> Result<Profile, Error> {
    let bearer = token.bearer(Utc::now()).inspect_err(|_| {
        info!("Access token expired, not requesting the profile");
    })?;

    let raw = platform.current_user_memberships(&bearer).await?;
    debug!("Fetched Bungie.net profile");
    Ok(Profile::from_response(raw, token))
}

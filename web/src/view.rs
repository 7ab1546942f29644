//! Minimal server-rendered pages.

use axum::http::StatusCode;
use domain::{LoginState, Profile};

pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n{}\n</body>\n</html>\n",
        escape(title),
        escape(title),
        body
    )
}

const SIGN_OUT: &str =
    "<form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form>";

pub(crate) fn home(state: &LoginState) -> String {
    let body = match state {
        LoginState::Idle => {
            "<p><a href=\"/login\">Sign in with Bungie.net</a></p>".to_string()
        }
        LoginState::Pending { .. } => {
            "<p>Waiting for Bungie.net to confirm your sign-in.</p>\n<p><a href=\"/login\">Start over</a></p>".to_string()
        }
        LoginState::Authenticated { .. } => {
            format!("<p>You are signed in.</p>\n<p><a href=\"/profile\">View your profile</a></p>\n{SIGN_OUT}")
        }
        LoginState::Failed { reason } => format!(
            "<p class=\"error\">{}</p>\n<p><a href=\"/login\">Try again</a></p>",
            escape(&reason.message())
        ),
    };
    page("Bungie.net login", &body)
}

pub(crate) fn profile(profile: &Profile) -> String {
    let display_name = profile
        .summary
        .display_name
        .as_deref()
        .unwrap_or("Unknown Guardian");
    let membership_id = profile
        .summary
        .membership_id
        .as_deref()
        .unwrap_or("unknown");
    let raw = serde_json::to_string_pretty(&profile.raw).unwrap_or_default();

    let body = format!(
        "<dl>\n<dt>Name</dt><dd>{}</dd>\n<dt>Membership id</dt><dd>{}</dd>\n</dl>\n<pre>{}</pre>\n{SIGN_OUT}",
        escape(display_name),
        escape(membership_id),
        escape(&raw)
    );
    page("Profile", &body)
}

pub(crate) fn failure(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<p class=\"error\">{}</p>\n<p><a href=\"/\">Back to start</a></p>",
        escape(message)
    );
    page(status.canonical_reason().unwrap_or("Error"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::FailureReason;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_home_shows_failure_reason_with_retry() {
        let html = home(&LoginState::Failed {
            reason: FailureReason::AuthorizationDenied("<access_denied>".to_string()),
        });
        assert!(html.contains("&lt;access_denied&gt;"));
        assert!(html.contains("href=\"/login\""));
    }
}

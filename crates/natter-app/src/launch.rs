//! Launch-parameter handling.
//!
//! The hosted identity service mails the user a verification link whose
//! query string carries a refresh token and a `type=verifyEmail` marker.
//! The terminal front-end accepts that link pasted as a command-line
//! argument; this module extracts the pair.

use url::Url;

/// Query parameters consumed once at startup.
///
/// Only the two keys the shell acts on are retained; everything else in
/// the pasted link is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    refresh_token: Option<String>,
    link_type: Option<String>,
}

impl LaunchParams {
    /// Empty launch state (a plain start with no pasted link).
    pub fn none() -> Self {
        Self::default()
    }

    /// Extracts launch parameters from a pasted link.
    ///
    /// Anything that does not parse as a URL yields empty parameters, so
    /// a mistyped argument degrades to a normal start.
    pub fn from_link(link: &str) -> Self {
        let Ok(url) = Url::parse(link) else {
            return Self::none();
        };

        let mut params = Self::none();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "refreshToken" => params.refresh_token = Some(value.into_owned()),
                "type" => params.link_type = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Returns the refresh token when the parameters form a complete
    /// verification pair (`refreshToken` plus `type=verifyEmail`).
    ///
    /// An empty token, a missing half, or any other `type` value is not a
    /// verification launch.
    pub fn verification_token(&self) -> Option<&str> {
        match (self.refresh_token.as_deref(), self.link_type.as_deref()) {
            (Some(token), Some("verifyEmail")) if !token.is_empty() => Some(token),
            _ => None,
        }
    }

    /// True when no parameters are retained.
    pub fn is_empty(&self) -> bool {
        self.refresh_token.is_none() && self.link_type.is_none()
    }
}

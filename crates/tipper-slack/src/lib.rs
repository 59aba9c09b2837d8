//! Slack adapter: RTM event stream in, Web API messages out.

pub mod api;
pub mod events;
pub mod rtm;

pub use api::SlackApi;
pub use rtm::SlackPlatform;

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("slack api error: {0}")]
    Api(String),

    #[error("rtm socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl SlackError {
    /// Credential problems that reconnecting will not fix.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Api(code) if matches!(
                code.as_str(),
                "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked"
            )
        )
    }
}

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::SlackError;

const SLACK_API_URL: &str = "https://slack.com/api";

/// Every Web API response carries `ok` and, on failure, an error code.
#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct RtmConnect {
    pub url: String,
    #[serde(rename = "self")]
    pub bot: BotSelf,
}

#[derive(Debug, Deserialize)]
pub struct BotSelf {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Deserialize)]
struct User {
    name: String,
    real_name: Option<String>,
    profile: Option<Profile>,
}

#[derive(Deserialize)]
struct Profile {
    real_name: Option<String>,
}

#[derive(Deserialize)]
struct Empty {}

/// Thin Slack Web API client over reqwest.
pub struct SlackApi {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl SlackApi {
    pub fn new(token: SecretString) -> Self {
        Self::with_base_url(token, SLACK_API_URL)
    }

    pub fn with_base_url(token: SecretString, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Open an RTM session: returns the socket URL and the bot's identity.
    pub async fn rtm_connect(&self) -> Result<RtmConnect, SlackError> {
        let request = self
            .http
            .post(format!("{}/rtm.connect", self.base_url))
            .bearer_auth(self.token.expose_secret());
        self.send(request).await
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let request = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "channel": channel, "text": text }));
        let _: Empty = self.send(request).await?;
        Ok(())
    }

    /// Profile real name, falling back to the account's real name, then handle.
    pub async fn display_name(&self, user: &str) -> Result<String, SlackError> {
        let request = self
            .http
            .get(format!("{}/users.info", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .query(&[("user", user)]);
        let info: UserInfo = self.send(request).await?;

        let user = info.user;
        let name = user
            .profile
            .and_then(|p| p.real_name)
            .filter(|n| !n.is_empty())
            .or(user.real_name.filter(|n| !n.is_empty()))
            .unwrap_or(user.name);
        Ok(name)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, SlackError> {
        let envelope: Envelope<T> = request.send().await?.error_for_status()?.json().await?;

        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            debug!("Slack API returned {}", code);
            return Err(SlackError::Api(code));
        }

        envelope
            .body
            .ok_or_else(|| SlackError::Api("unexpected response shape".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn api(server: &mockito::Server) -> SlackApi {
        SlackApi::with_base_url(SecretString::new("xoxb-test".to_string()), &server.url())
    }

    #[tokio::test]
    async fn rtm_connect_reads_url_and_self() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rtm.connect")
            .match_header("authorization", "Bearer xoxb-test")
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "url": "wss://example.test/websocket/abc",
                    "self": { "id": "UBOT", "name": "tipper" },
                    "team": { "id": "T1" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let session = api(&server).rtm_connect().await.unwrap();
        assert_eq!(session.url, "wss://example.test/websocket/abc");
        assert_eq!(session.bot.id, "UBOT");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_auth_is_an_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rtm.connect")
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error":"invalid_auth"}"#)
            .create_async()
            .await;

        let err = api(&server).rtm_connect().await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn post_message_sends_channel_and_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::Json(json!({ "channel": "C1", "text": "hi" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"channel":"C1","ts":"1.2"}"#)
            .create_async()
            .await;

        api(&server).post_message("C1", "hi").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_message_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;

        let err = api(&server).post_message("C404", "hi").await.unwrap_err();
        assert!(matches!(err, SlackError::Api(ref code) if code == "channel_not_found"));
        assert!(!err.is_auth_failure());
    }

    #[tokio::test]
    async fn display_name_prefers_profile_real_name() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users.info")
            .match_query(Matcher::UrlEncoded("user".into(), "UA".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "user": { "id": "UA", "name": "alice", "profile": { "real_name": "Alice Liddell" } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        assert_eq!(api(&server).display_name("UA").await.unwrap(), "Alice Liddell");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use pulse_core::config::SlackConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::blocks::{Block, MessageTemplate};

const POST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack transport failure: {0}")]
    Transport(String),
    #[error("slack returned status {status}")]
    Status { status: u16 },
    #[error("slack api error: {0}")]
    Api(String),
    #[error("slack response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("slack client could not be built: {0}")]
    Build(String),
}

/// Delivers a rendered message into a channel or DM.
#[async_trait]
pub trait SlackPoster: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;
}

/// Minimal Web API client: `chat.postMessage` only.
pub struct SlackWebClient {
    http: reqwest::Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        api_base_url: impl Into<String>,
        bot_token: SecretString,
    ) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .build()
            .map_err(|error| SlackApiError::Build(error.to_string()))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            bot_token,
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, SlackApiError> {
        Self::new(config.api_base_url.clone(), config.bot_token.clone())
    }

    pub fn post_message_url(&self) -> String {
        format!("{}/chat.postMessage", self.api_base_url)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
}

impl<'a> PostMessageRequest<'a> {
    pub(crate) fn new(channel: &'a str, message: &'a MessageTemplate) -> Self {
        Self { channel, text: &message.fallback_text, blocks: &message.blocks }
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

fn check_response(response: PostMessageResponse) -> Result<(), SlackApiError> {
    if response.ok {
        Ok(())
    } else {
        Err(SlackApiError::Api(response.error.unwrap_or_else(|| "unknown_error".to_owned())))
    }
}

#[async_trait]
impl SlackPoster for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let response = self
            .http
            .post(self.post_message_url())
            .bearer_auth(self.bot_token.expose_secret())
            .json(&PostMessageRequest::new(channel, message))
            .send()
            .await
            .map_err(|error| SlackApiError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackApiError::Status { status: status.as_u16() });
        }

        let payload: PostMessageResponse = response
            .json()
            .await
            .map_err(|error| SlackApiError::MalformedResponse(error.to_string()))?;

        match check_response(payload) {
            Ok(()) => {
                debug!(
                    event_name = "egress.slack.message_posted",
                    channel,
                    blocks = message.blocks.len(),
                    "slack message posted"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    event_name = "egress.slack.message_rejected",
                    channel,
                    error = %error,
                    "slack rejected chat.postMessage"
                );
                Err(error)
            }
        }
    }
}

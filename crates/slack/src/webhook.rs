//! Decoding of the Events API callbacks and slash-command forms Slack posts to
//! the bot's request URL.

use serde::Deserialize;
use thiserror::Error;

use crate::commands::SlashCommandPayload;
use crate::events::{DirectMessageEvent, SlackEnvelope, SlackEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookRequest {
    /// Handshake Slack performs when the request URL is configured.
    UrlVerification { challenge: String },
    Event(SlackEnvelope),
    Ignored { reason: &'static str },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("malformed slack callback: {0}")]
    Malformed(String),
    #[error("url verification is missing the challenge")]
    MissingChallenge,
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    #[serde(rename = "type")]
    kind: String,
    challenge: Option<String>,
    event_id: Option<String>,
    event: Option<CallbackEvent>,
    #[serde(default)]
    authorizations: Vec<Authorization>,
}

#[derive(Debug, Deserialize)]
struct CallbackEvent {
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    channel_type: Option<String>,
    bot_id: Option<String>,
    user: Option<String>,
    text: Option<String>,
    channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorization {
    user_id: Option<String>,
}

pub fn parse_event_callback(body: &[u8]) -> Result<WebhookRequest, WebhookError> {
    let callback: CallbackBody = serde_json::from_slice(body)
        .map_err(|error| WebhookError::Malformed(error.to_string()))?;

    match callback.kind.as_str() {
        "url_verification" => {
            let challenge = callback.challenge.ok_or(WebhookError::MissingChallenge)?;
            Ok(WebhookRequest::UrlVerification { challenge })
        }
        "event_callback" => Ok(classify_callback(callback)),
        _ => Ok(WebhookRequest::Ignored { reason: "unsupported_callback_type" }),
    }
}

fn classify_callback(callback: CallbackBody) -> WebhookRequest {
    let Some(event) = callback.event else {
        return WebhookRequest::Ignored { reason: "missing_event" };
    };
    let envelope_id = callback.event_id.unwrap_or_else(|| "unknown-event".to_owned());

    if event.kind != "message" {
        return WebhookRequest::Event(SlackEnvelope {
            envelope_id,
            event: SlackEvent::Unsupported { event_type: event.kind },
        });
    }
    if event.channel_type.as_deref() != Some("im") {
        return WebhookRequest::Ignored { reason: "not_direct_message" };
    }
    if event.subtype.is_some() {
        return WebhookRequest::Ignored { reason: "message_subtype" };
    }
    if event.bot_id.is_some() {
        return WebhookRequest::Ignored { reason: "bot_message" };
    }

    let Some(user_id) = event.user.filter(|user| !user.is_empty()) else {
        return WebhookRequest::Ignored { reason: "missing_user" };
    };
    let bot_user = callback.authorizations.first().and_then(|auth| auth.user_id.as_deref());
    if bot_user == Some(user_id.as_str()) {
        return WebhookRequest::Ignored { reason: "own_message" };
    }
    let Some(channel_id) = event.channel.filter(|channel| !channel.is_empty()) else {
        return WebhookRequest::Ignored { reason: "missing_channel" };
    };

    WebhookRequest::Event(SlackEnvelope {
        envelope_id,
        event: SlackEvent::DirectMessage(DirectMessageEvent {
            channel_id,
            user_id,
            text: event.text.unwrap_or_default(),
        }),
    })
}

/// Wraps an already-decoded slash-command form, stamping the request id the
/// ingress layer assigned.
pub fn slash_command_envelope(
    mut payload: SlashCommandPayload,
    request_id: impl Into<String>,
) -> SlackEnvelope {
    let request_id = request_id.into();
    payload.request_id = request_id.clone();
    SlackEnvelope { envelope_id: request_id, event: SlackEvent::SlashCommand(payload) }
}

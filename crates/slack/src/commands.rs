use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

/// Form fields Slack posts for a slash command. `request_id` is not part of
/// the form; the ingress layer assigns one per request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashCommandKind {
    Digest,
    Preferences,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: SlashCommandKind,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PulseCommand {
    Digest,
    Onboard,
    Preferences { description: Option<String> },
    Help,
    Unknown { verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("slash command is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_pulse_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    let command = match payload.command.trim() {
        "/digest" => SlashCommandKind::Digest,
        "/preferences" => SlashCommandKind::Preferences,
        _ => return Err(CommandParseError::UnsupportedCommand(payload.command)),
    };
    if payload.user_id.trim().is_empty() {
        return Err(CommandParseError::MissingField("user_id"));
    }
    if payload.channel_id.trim().is_empty() {
        return Err(CommandParseError::MissingField("channel_id"));
    }

    Ok(CommandEnvelope {
        command,
        text: payload.text.trim().to_owned(),
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_id: payload.trigger_id,
        request_id: payload.request_id,
    })
}

pub fn classify_pulse_command(command: SlashCommandKind, text: &str) -> PulseCommand {
    let text = text.trim();
    if command == SlashCommandKind::Preferences {
        let description = if text.is_empty() { None } else { Some(text.to_owned()) };
        return PulseCommand::Preferences { description };
    }

    let verb = text.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    match verb.as_str() {
        "" => PulseCommand::Digest,
        "setup" | "onboard" | "reset" | "restart" => PulseCommand::Onboard,
        "help" => PulseCommand::Help,
        _ => PulseCommand::Unknown { verb },
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: PulseCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn route(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match classify_pulse_command(envelope.command, &envelope.text) {
            PulseCommand::Digest => self.service.digest(envelope).await,
            PulseCommand::Onboard => self.service.onboard(envelope).await,
            PulseCommand::Preferences { description } => {
                self.service.preferences(description, envelope).await
            }
            PulseCommand::Help => Ok(blocks::help_message()),
            PulseCommand::Unknown { verb } => self.service.unrecognized(&verb, envelope).await,
        }
    }
}

#[async_trait]
pub trait PulseCommandService: Send + Sync {
    async fn digest(&self, envelope: &CommandEnvelope) -> Result<MessageTemplate, CommandRouteError>;

    async fn onboard(&self, envelope: &CommandEnvelope)
        -> Result<MessageTemplate, CommandRouteError>;

    async fn preferences(
        &self,
        description: Option<String>,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn unrecognized(
        &self,
        verb: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

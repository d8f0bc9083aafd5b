//! Slack surface of the bot.
//!
//! - **Webhook** (`webhook`) - decodes Events API callbacks and URL verification
//! - **Slash Commands** (`commands`) - `/digest`, `/digest setup`, `/preferences`
//! - **Events** (`events`) - dispatcher routing slash commands and direct messages
//! - **Block Kit** (`blocks`) - onboarding, profile and digest message builders
//! - **Web API** (`client`) - `chat.postMessage` behind the `SlackPoster` seam
//!
//! # Architecture
//!
//! ```text
//! POST /slack/events → webhook → EventDispatcher → Handlers → Conversation Handler
//!                                      ↓
//!                     chat.postMessage ← Block Kit ← Reply
//! ```

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod webhook;

pub use blocks::{MessageBuilder, MessageTemplate};
pub use client::{SlackApiError, SlackPoster, SlackWebClient};
pub use commands::{CommandEnvelope, CommandRouter, PulseCommand, PulseCommandService};
pub use events::{EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};
pub use webhook::{parse_event_callback, WebhookRequest};

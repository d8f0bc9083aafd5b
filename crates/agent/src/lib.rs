//! Model-facing side of the bot.
//!
//! - `llm`: OpenAI-compatible chat-completions client behind the `LlmClient` seam
//! - `extractor`: description to `UserProfile`, tolerant of untidy model output
//! - `rationale`: optional model-written "why this matters" lines for a digest
//! - `guardrails`: limits applied to descriptions before they reach the model
//! - `conversation`: the onboarding conversation over the profile store
//!
//! The model only ever proposes a profile. State transitions and article
//! selection stay deterministic.

pub mod conversation;
pub mod extractor;
pub mod guardrails;
pub mod llm;
pub mod rationale;
pub mod runtime;

pub use conversation::{ConversationHandler, ConversationReply, ReplyFailure};
pub use extractor::ProfileExtractor;
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{CompletionRequest, LlmClient, LlmError, OpenAiCompatibleClient};
pub use rationale::LlmRationaleWriter;
pub use runtime::AgentRuntime;

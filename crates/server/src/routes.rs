use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use pulse_agent::conversation::ConversationHandler;
use pulse_core::errors::InterfaceError;
use pulse_slack::blocks::{self, Block, MessageTemplate};
use pulse_slack::client::SlackPoster;
use pulse_slack::commands::SlashCommandPayload;
use pulse_slack::events::{
    DirectMessageHandler, DispatchError, EventContext, EventDispatcher, EventHandlerError,
    HandlerResult, SlackEnvelope, SlashCommandHandler,
};
use pulse_slack::webhook::{parse_event_callback, slash_command_envelope, WebhookRequest};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::ConversationService;

const SLACK_RETRY_HEADER: &str = "x-slack-retry-num";

#[derive(Clone)]
pub struct SlackState {
    dispatcher: Arc<EventDispatcher>,
    poster: Arc<dyn SlackPoster>,
}

impl SlackState {
    pub fn new(conversation: Arc<ConversationHandler>, poster: Arc<dyn SlackPoster>) -> Self {
        let service = ConversationService::new(conversation);
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(SlashCommandHandler::new(service.clone()));
        dispatcher.register(DirectMessageHandler::new(service));
        Self { dispatcher: Arc::new(dispatcher), poster }
    }
}

/// Body returned to a slash command. Slack renders it only to the invoking user.
#[derive(Debug, Serialize)]
pub struct EphemeralAck {
    pub response_type: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl EphemeralAck {
    fn text(text: impl Into<String>) -> Self {
        Self { response_type: "ephemeral", text: text.into(), blocks: Vec::new() }
    }

    fn message(message: MessageTemplate) -> Self {
        Self { response_type: "ephemeral", text: message.fallback_text, blocks: message.blocks }
    }
}

pub fn router(state: SlackState) -> Router {
    Router::new().route("/slack/events", post(slack_events)).with_state(state)
}

/// Single request URL for both Events API callbacks (JSON) and slash commands
/// (form-encoded).
pub async fn slack_events(State(state): State<SlackState>, request: Request) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        // The first delivery is still processed synchronously; redeliveries
        // are acknowledged so a slow reply is not handled twice.
        if let Some(retry) = request.headers().get(SLACK_RETRY_HEADER) {
            info!(
                event_name = "ingress.slack.retry_acknowledged",
                correlation_id = %correlation_id,
                retry_num = retry.to_str().unwrap_or("?"),
                "acknowledged slack redelivery without reprocessing"
            );
            return Json(json!({ "ok": true })).into_response();
        }
        match Bytes::from_request(request, &state).await {
            Ok(body) => handle_event_callback(&state, &body, correlation_id).await,
            Err(rejection) => rejection.into_response(),
        }
    } else {
        match Form::<SlashCommandPayload>::from_request(request, &state).await {
            Ok(Form(payload)) => handle_slash_command(&state, payload, correlation_id).await,
            Err(rejection) => {
                warn!(
                    event_name = "ingress.slack.form_rejected",
                    correlation_id = %correlation_id,
                    error = %rejection,
                    "slash command form could not be decoded"
                );
                rejection.into_response()
            }
        }
    }
}

async fn handle_event_callback(state: &SlackState, body: &[u8], correlation_id: String) -> Response {
    let envelope = match parse_event_callback(body) {
        Ok(WebhookRequest::UrlVerification { challenge }) => {
            info!(
                event_name = "ingress.slack.url_verification",
                correlation_id = %correlation_id,
                "answered slack url verification"
            );
            return Json(json!({ "challenge": challenge })).into_response();
        }
        Ok(WebhookRequest::Ignored { reason }) => {
            debug!(
                event_name = "ingress.slack.callback_ignored",
                correlation_id = %correlation_id,
                reason,
                "slack callback ignored"
            );
            return Json(json!({ "ok": true })).into_response();
        }
        Ok(WebhookRequest::Event(envelope)) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.callback_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "slack callback could not be decoded"
            );
            return (StatusCode::BAD_REQUEST, Json(json!({ "ok": false, "error": error.to_string() })))
                .into_response();
        }
    };

    if let Some(message) = dispatch(state, &envelope, &correlation_id).await {
        if let Some(channel) = envelope.event.reply_channel() {
            // Events API callbacks have no inline reply, so a failed post is only logged.
            deliver(state, channel, &message, &correlation_id).await;
        }
    }
    Json(json!({ "ok": true })).into_response()
}

async fn handle_slash_command(
    state: &SlackState,
    payload: SlashCommandPayload,
    correlation_id: String,
) -> Response {
    let envelope = slash_command_envelope(payload, correlation_id.clone());
    let Some(message) = dispatch(state, &envelope, &correlation_id).await else {
        return Json(EphemeralAck::text("Nothing to do for that command.")).into_response();
    };

    let channel = envelope.event.reply_channel().unwrap_or_default();
    if deliver(state, channel, &message, &correlation_id).await {
        Json(EphemeralAck::text(ack_text(&message))).into_response()
    } else {
        // Answer inline when the bot cannot post into the channel.
        Json(EphemeralAck::message(message)).into_response()
    }
}

async fn dispatch(
    state: &SlackState,
    envelope: &SlackEnvelope,
    correlation_id: &str,
) -> Option<MessageTemplate> {
    info!(
        event_name = "ingress.slack.envelope_received",
        envelope_id = %envelope.envelope_id,
        event_type = ?envelope.event.event_type(),
        user_id = envelope.event.user_id().unwrap_or("unknown"),
        correlation_id,
        "received slack envelope"
    );

    let context = EventContext { correlation_id: correlation_id.to_owned() };
    match state.dispatcher.dispatch(envelope, &context).await {
        Ok(HandlerResult::Responded(message)) => Some(message),
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => None,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.dispatch_failed",
                envelope_id = %envelope.envelope_id,
                correlation_id,
                error = %error,
                "event dispatch failed"
            );
            let interface = interface_error(error, correlation_id);
            Some(blocks::error_message(interface.user_message(), interface.correlation_id()))
        }
    }
}

fn interface_error(error: DispatchError, correlation_id: &str) -> InterfaceError {
    let correlation_id = correlation_id.to_owned();
    match error {
        DispatchError::Handler(EventHandlerError::Parse(error)) => {
            InterfaceError::BadRequest { message: error.to_string(), correlation_id }
        }
        DispatchError::Handler(error) => {
            InterfaceError::Internal { message: error.to_string(), correlation_id }
        }
    }
}

async fn deliver(
    state: &SlackState,
    channel: &str,
    message: &MessageTemplate,
    correlation_id: &str,
) -> bool {
    match state.poster.post_message(channel, message).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                event_name = "egress.slack.post_failed",
                channel,
                correlation_id,
                error = %error,
                "could not post reply to slack"
            );
            false
        }
    }
}

fn ack_text(message: &MessageTemplate) -> String {
    if message.blocks.iter().any(|block| block.block_id() == "pulse.error.summary.v1") {
        "❌ Something went wrong, see the message above.".to_owned()
    } else {
        "✅ On it! Check the message above.".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, HeaderValue, Request, StatusCode},
        Router,
    };
    use pulse_agent::guardrails::GuardrailPolicy;
    use pulse_agent::llm::{CompletionRequest, LlmClient, LlmError};
    use pulse_agent::runtime::AgentRuntime;
    use pulse_core::catalog::StaticCatalog;
    use pulse_core::config::DigestConfig;
    use pulse_core::domain::profile::{Role, UserId};
    use pulse_core::flows::OnboardingState;
    use pulse_db::{InMemoryProfileStore, ProfileStore};
    use pulse_slack::blocks::MessageTemplate;
    use pulse_slack::client::{SlackApiError, SlackPoster};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use super::{router, SlackState};

    struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_owned())))
        }
    }

    #[derive(Default)]
    struct RecordingPoster {
        posts: Mutex<Vec<(String, MessageTemplate)>>,
        fail: bool,
    }

    #[async_trait]
    impl SlackPoster for RecordingPoster {
        async fn post_message(
            &self,
            channel: &str,
            message: &MessageTemplate,
        ) -> Result<(), SlackApiError> {
            if self.fail {
                return Err(SlackApiError::Api("not_in_channel".to_owned()));
            }
            self.posts.lock().await.push((channel.to_owned(), message.clone()));
            Ok(())
        }
    }

    struct Harness {
        app: Router,
        store: Arc<InMemoryProfileStore>,
        poster: Arc<RecordingPoster>,
    }

    fn harness(responses: Vec<Result<String, LlmError>>, poster: RecordingPoster) -> Harness {
        let llm = Arc::new(ScriptedLlm { responses: Mutex::new(responses.into()) });
        let store = Arc::new(InMemoryProfileStore::new());
        let poster = Arc::new(poster);
        let conversation = AgentRuntime::new(llm, GuardrailPolicy::default()).conversation_handler(
            store.clone(),
            &DigestConfig { max_articles: 5, ai_rationale: false },
            Arc::new(StaticCatalog::builtin()),
        );
        let app = router(SlackState::new(Arc::new(conversation), poster.clone()));
        Harness { app, store, poster }
    }

    fn slash(command: &str, text: &str) -> Request<Body> {
        let form = format!(
            "command={}&text={}&user_id=U1&channel_id=C1&trigger_id=T1",
            command.replace('/', "%2F"),
            text.replace(' ', "+")
        );
        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("request")
    }

    fn callback(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn direct_message(text: &str) -> Request<Body> {
        callback(json!({
            "type": "event_callback",
            "event_id": "Ev1",
            "authorizations": [{ "user_id": "UBOT" }],
            "event": {
                "type": "message",
                "channel_type": "im",
                "user": "U1",
                "text": text,
                "channel": "D1",
            },
        }))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap_or_default();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn url_verification_returns_challenge() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        let response = harness
            .app
            .oneshot(callback(json!({ "type": "url_verification", "challenge": "c-123" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "challenge": "c-123" }));
    }

    #[tokio::test]
    async fn digest_command_then_description_creates_profile_and_posts_digest() {
        let harness = harness(
            vec![Ok(r#"{"role": "crypto", "interests": ["DeFi", "trading"]}"#.to_owned())],
            RecordingPoster::default(),
        );

        let ack = harness.app.clone().oneshot(slash("/digest", "")).await.expect("response");
        assert_eq!(ack.status(), StatusCode::OK);
        assert_eq!(json_body(ack).await["response_type"], "ephemeral");

        let response = harness
            .app
            .clone()
            .oneshot(direct_message("I'm a crypto trader interested in DeFi"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let posts = harness.poster.posts.lock().await;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].0, "C1");
        assert!(posts[0].1.fallback_text.contains("Welcome to PulseBot"));
        assert_eq!(posts[1].0, "D1");
        assert_eq!(posts[1].1.fallback_text, "Profile created successfully!");
        assert!(posts[1].1.rendered_text().contains("Ethereum"));

        let profile = harness.store.get(&UserId::new("U1")).await.expect("profile stored");
        assert_eq!(profile.role, Role::Crypto);
    }

    #[tokio::test]
    async fn bot_messages_are_acknowledged_without_reply() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        let response = harness
            .app
            .oneshot(callback(json!({
                "type": "event_callback",
                "event": { "type": "message", "bot_id": "B1", "text": "beep", "channel": "D1" },
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(harness.poster.posts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn channel_messages_are_not_treated_as_direct_messages() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        for text in ["lunch anyone?", "standup in 5"] {
            let response = harness
                .app
                .clone()
                .oneshot(callback(json!({
                    "type": "event_callback",
                    "event_id": "Ev2",
                    "authorizations": [{ "user_id": "UBOT" }],
                    "event": {
                        "type": "message",
                        "channel_type": "channel",
                        "user": "U1",
                        "text": text,
                        "channel": "C_GENERAL",
                    },
                })))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(harness.poster.posts.lock().await.is_empty());
        assert_eq!(harness.store.get_state(&UserId::new("U1")).await, OnboardingState::NotStarted);
    }

    #[tokio::test]
    async fn redelivered_callbacks_are_acknowledged_without_reprocessing() {
        let harness = harness(
            vec![Ok(r#"{"role": "crypto", "interests": ["DeFi"]}"#.to_owned())],
            RecordingPoster::default(),
        );
        harness.app.clone().oneshot(slash("/digest", "")).await.expect("response");

        let mut retry = direct_message("I'm a crypto trader");
        retry.headers_mut().insert("x-slack-retry-num", HeaderValue::from_static("1"));
        let response = harness.app.clone().oneshot(retry).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "ok": true }));
        assert_eq!(harness.poster.posts.lock().await.len(), 1);
        assert_eq!(
            harness.store.get_state(&UserId::new("U1")).await,
            OnboardingState::AwaitingDescription
        );
        assert!(harness.store.get(&UserId::new("U1")).await.is_none());
    }

    #[tokio::test]
    async fn preferences_without_profile_posts_no_profile_notice() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        harness.app.oneshot(slash("/preferences", "")).await.expect("response");

        let posts = harness.poster.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert!(posts[0].1.rendered_text().contains("I don't have a profile for you yet"));
    }

    #[tokio::test]
    async fn failed_post_falls_back_to_inline_ephemeral_reply() {
        let harness = harness(Vec::new(), RecordingPoster { fail: true, ..RecordingPoster::default() });

        let response = harness.app.oneshot(slash("/digest", "help")).await.expect("response");

        let body = json_body(response).await;
        assert_eq!(body["response_type"], "ephemeral");
        assert_eq!(body["text"], "PulseBot help");
        assert!(body["blocks"].is_array());
    }

    #[tokio::test]
    async fn unsupported_command_posts_bad_request_notice() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        let response = harness.app.oneshot(slash("/weather", "")).await.expect("response");

        assert_eq!(json_body(response).await["text"], "❌ Something went wrong, see the message above.");
        let posts = harness.poster.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert!(posts[0].1.rendered_text().contains("The request could not be processed"));
    }

    #[tokio::test]
    async fn malformed_callback_is_bad_request() {
        let harness = harness(Vec::new(), RecordingPoster::default());

        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let response = harness.app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! ChatSession: one thread's conversation against the chat0 server

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chat0_models::ModelRegistry;
use chat0_models::auth::CredentialSource;
use chat0_models::providers::{Content, Role};

use super::state::{ChatStatus, DeltaKind, SessionEvent, append_delta};
use crate::error::SessionError;
use crate::protocol::{ChatApiRequest, SummaryRequest, UiStreamEvent};
use crate::store::{ChatMessage, ChatStore, StoreError};
use crate::title::{TitleDeriver, TitleOutcome};
use crate::transport::{ChatTransport, CredentialHeader};

const EVENT_CAPACITY: usize = 256;

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn ChatStore>,
    pub chat: Arc<dyn ChatTransport>,
    pub titles: TitleDeriver,
    pub credentials: Arc<dyn CredentialSource>,
    pub registry: Arc<ModelRegistry>,
}

/// How a turn ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant message finished. Its parts are empty when the response
    /// carried no content.
    Completed(ChatMessage),
    /// `stop()` was called or a newer turn superseded this one.
    Stopped,
}

struct State {
    model: String,
    messages: Vec<ChatMessage>,
    status: ChatStatus,
    error: Option<String>,
    title: Option<String>,
    thread_exists: bool,
    generation: u64,
    cancel: Option<CancellationToken>,
    /// Id of the assistant message being streamed.
    streaming_id: Option<String>,
}

struct Inner {
    thread_id: String,
    deps: SessionDeps,
    state: Mutex<State>,
    events: broadcast::Sender<SessionEvent>,
}

/// Client side of one thread
///
/// Cloning yields another handle to the same session, so `stop()` can be
/// called while `send()` is awaited elsewhere.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    /// Start a session for a thread that does not exist yet.
    pub fn new(thread_id: impl Into<String>, model: impl Into<String>, deps: SessionDeps) -> Self {
        Self::from_parts(thread_id.into(), model.into(), deps, Vec::new(), None, false)
    }

    /// Resume a stored thread, or start a new one if `thread_id` is unknown.
    pub async fn open(
        thread_id: impl Into<String>,
        model: impl Into<String>,
        deps: SessionDeps,
    ) -> Result<Self, SessionError> {
        let thread_id = thread_id.into();
        let Some(thread) = deps.store.get_thread(&thread_id).await? else {
            debug!(thread_id = %thread_id, "thread not stored yet");
            return Ok(Self::new(thread_id, model, deps));
        };

        let messages = deps.store.list_messages(&thread_id).await?;
        debug!(thread_id = %thread_id, messages = messages.len(), "resumed thread");
        Ok(Self::from_parts(
            thread_id,
            model.into(),
            deps,
            messages,
            thread.title,
            true,
        ))
    }

    fn from_parts(
        thread_id: String,
        model: String,
        deps: SessionDeps,
        messages: Vec<ChatMessage>,
        title: Option<String>,
        thread_exists: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                thread_id,
                deps,
                state: Mutex::new(State {
                    model,
                    messages,
                    status: ChatStatus::Idle,
                    error: None,
                    title,
                    thread_exists,
                    generation: 0,
                    cancel: None,
                    streaming_id: None,
                }),
                events,
            }),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.inner.thread_id
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn status(&self) -> ChatStatus {
        self.inner.state.lock().await.status
    }

    /// Snapshot of the in-memory message list.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().await.messages.clone()
    }

    /// Message of the last failed turn.
    pub async fn error(&self) -> Option<String> {
        self.inner.state.lock().await.error.clone()
    }

    pub async fn title(&self) -> Option<String> {
        self.inner.state.lock().await.title.clone()
    }

    pub async fn model(&self) -> String {
        self.inner.state.lock().await.model.clone()
    }

    /// Select the model used by subsequent turns.
    pub async fn set_model(&self, model: impl Into<String>) {
        self.inner.state.lock().await.model = model.into();
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    fn set_status(&self, state: &mut State, status: ChatStatus) {
        if state.status != status {
            state.status = status;
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    /// Persist a user message and stream the assistant's reply.
    ///
    /// Returns once the turn completes, is stopped, or fails. The first user
    /// message of an untitled thread also derives a title, concurrently.
    pub async fn send(&self, content: impl Into<Content>) -> Result<TurnOutcome, SessionError> {
        let message = ChatMessage::new(Role::User, content);
        let thread_id = self.inner.thread_id.clone();

        // Claim the session, then write without holding the lock.
        let (generation, cancel, create_thread) = {
            let mut state = self.inner.state.lock().await;
            if state.status.is_active() {
                return Err(SessionError::Busy);
            }
            let (generation, cancel) = self.reserve(&mut state);
            (generation, cancel, !state.thread_exists)
        };

        if let Err(e) = self.persist_prompt(&message, create_thread).await {
            self.fail(generation, e.to_string()).await;
            return Err(e.into());
        }

        let (turn, summary) = {
            let mut state = self.inner.state.lock().await;
            let first_user_message = !state.messages.iter().any(|m| m.role == Role::User);
            let summary = (first_user_message && state.title.is_none()).then(|| SummaryRequest {
                prompt: message.content.as_text(),
                thread_id: thread_id.clone(),
                message_id: message.id.clone(),
                is_title: true,
            });

            state.messages.push(message.clone());
            self.emit(SessionEvent::MessageAppended(message));
            let turn = (state.generation == generation)
                .then(|| self.build_turn(&state, generation, cancel));
            (turn, summary)
        };

        let run = async {
            match turn {
                Some(turn) => self.run_turn(turn).await,
                None => Ok(TurnOutcome::Stopped),
            }
        };
        let derive_title = async {
            if let Some(request) = summary {
                let outcome = self.inner.deps.titles.derive(request).await;
                self.apply_title(outcome).await;
            }
        };

        let (outcome, ()) = tokio::join!(run, derive_title);
        outcome
    }

    async fn persist_prompt(
        &self,
        message: &ChatMessage,
        create_thread: bool,
    ) -> Result<(), StoreError> {
        let store = &self.inner.deps.store;
        let thread_id = &self.inner.thread_id;
        if create_thread {
            store.create_thread(thread_id).await?;
            self.inner.state.lock().await.thread_exists = true;
            info!(thread_id = %thread_id, "created thread");
        }
        store.create_message(thread_id, message).await
    }

    /// Drop the trailing assistant message and request a new one.
    pub async fn regenerate(&self) -> Result<TurnOutcome, SessionError> {
        let turn = {
            let mut state = self.inner.state.lock().await;
            if state.status.is_active() {
                return Err(SessionError::Busy);
            }

            let trailing_assistant = state
                .messages
                .last()
                .is_some_and(|m| m.role == Role::Assistant);
            let prompt_index = state
                .messages
                .len()
                .checked_sub(1 + usize::from(trailing_assistant));
            let has_prompt =
                prompt_index.is_some_and(|i| state.messages[i].role == Role::User);
            if !has_prompt {
                return Err(SessionError::NothingToRegenerate);
            }

            if trailing_assistant && let Some(removed) = state.messages.pop() {
                debug!(thread_id = %self.inner.thread_id, message_id = %removed.id, "discarding assistant message");
                self.emit(SessionEvent::MessageRemoved(removed.id));
            }
            let (generation, cancel) = self.reserve(&mut state);
            self.build_turn(&state, generation, cancel)
        };

        self.run_turn(turn).await
    }

    /// Cancel the active turn.
    ///
    /// No chunk received after this returns is applied, and the status is
    /// `Idle` if a turn was in flight. The partial message stays in memory.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.generation += 1;
        state.streaming_id = None;
        if state.status.is_active() {
            info!(thread_id = %self.inner.thread_id, "stopped response");
            self.set_status(&mut state, ChatStatus::Idle);
        }
    }

    /// Mark a new turn as submitted and invalidate any older one.
    fn reserve(&self, state: &mut State) -> (u64, CancellationToken) {
        state.generation += 1;
        let cancel = CancellationToken::new();
        state.cancel = Some(cancel.clone());
        state.error = None;
        state.streaming_id = None;
        self.set_status(state, ChatStatus::Submitted);
        (state.generation, cancel)
    }

    fn build_turn(&self, state: &State, generation: u64, cancel: CancellationToken) -> Turn {
        let model = state.model.clone();
        Turn {
            generation,
            cancel,
            credential: self.credential_for(&model),
            request: ChatApiRequest {
                id: Some(self.inner.thread_id.clone()),
                model,
                messages: state
                    .messages
                    .iter()
                    .map(ChatMessage::to_request_message)
                    .collect(),
            },
        }
    }

    /// Header for the model's provider; the value is empty when no key is known.
    fn credential_for(&self, model: &str) -> Option<CredentialHeader> {
        let Ok(descriptor) = self.inner.deps.registry.resolve(model) else {
            debug!(model, "model not in local registry, sending no credential");
            return None;
        };
        let key = self.inner.deps.credentials.get_key(&descriptor.provider);
        if key.is_none() {
            warn!(model, provider = %descriptor.provider, "no API key for provider");
        }
        Some(CredentialHeader::new(
            &descriptor.credential_header,
            key.as_ref().map(|k| k.expose_secret()).unwrap_or_default(),
        ))
    }

    async fn run_turn(&self, turn: Turn) -> Result<TurnOutcome, SessionError> {
        let Turn {
            generation,
            cancel,
            credential,
            request,
        } = turn;
        debug!(thread_id = %self.inner.thread_id, model = %request.model, generation, "opening turn");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(TurnOutcome::Stopped),
            opened = self.inner.deps.chat.open(request, credential) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        let mut start_id: Option<String> = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TurnOutcome::Stopped),
                next = stream.next() => next,
            };

            let event = match next {
                None => break,
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    self.fail(generation, e.to_string()).await;
                    return Err(e.into());
                }
            };

            let applied = match event {
                UiStreamEvent::Start { message_id } => {
                    start_id = message_id;
                    true
                }
                UiStreamEvent::TextDelta { delta, .. } => {
                    self.apply_delta(generation, start_id.as_deref(), DeltaKind::Text, delta)
                        .await
                }
                UiStreamEvent::ReasoningDelta { delta, .. } => {
                    self.apply_delta(generation, start_id.as_deref(), DeltaKind::Reasoning, delta)
                        .await
                }
                UiStreamEvent::Finish { finish_reason } => {
                    debug!(finish_reason = ?finish_reason, "stream finished");
                    break;
                }
                UiStreamEvent::Error { error_text } => {
                    self.fail(generation, error_text.clone()).await;
                    return Err(SessionError::Stream(error_text));
                }
                _ => true,
            };
            if !applied {
                return Ok(TurnOutcome::Stopped);
            }
        }

        self.complete(generation, start_id).await
    }

    /// Apply a delta unless the turn was superseded.
    async fn apply_delta(
        &self,
        generation: u64,
        start_id: Option<&str>,
        kind: DeltaKind,
        delta: String,
    ) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding superseded chunk");
            return false;
        }

        let message_id = match &state.streaming_id {
            Some(id) => id.clone(),
            None => {
                let id = start_id
                    .map(str::to_string)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let mut message = ChatMessage::new(Role::Assistant, Content::Parts(Vec::new()));
                message.id = id.clone();
                state.messages.push(message.clone());
                state.streaming_id = Some(id.clone());
                self.emit(SessionEvent::MessageAppended(message));
                self.set_status(&mut state, ChatStatus::Streaming);
                id
            }
        };

        if let Some(message) = state.messages.last_mut() {
            append_delta(&mut message.content, kind, &delta);
        }
        self.emit(match kind {
            DeltaKind::Text => SessionEvent::TextDelta { message_id, delta },
            DeltaKind::Reasoning => SessionEvent::ReasoningDelta { message_id, delta },
        });
        true
    }

    async fn complete(
        &self,
        generation: u64,
        start_id: Option<String>,
    ) -> Result<TurnOutcome, SessionError> {
        let message = {
            let mut state = self.inner.state.lock().await;
            if state.generation != generation {
                return Ok(TurnOutcome::Stopped);
            }
            state.cancel = None;
            let streamed = state.streaming_id.take().is_some();
            let message = match state.messages.last_mut().filter(|_| streamed) {
                Some(message) => {
                    message.created_at = Utc::now();
                    message.clone()
                }
                None => {
                    debug!(thread_id = %self.inner.thread_id, "response had no content");
                    let mut message = ChatMessage::new(Role::Assistant, Content::Parts(Vec::new()));
                    if let Some(id) = start_id {
                        message.id = id;
                    }
                    state.messages.push(message.clone());
                    self.emit(SessionEvent::MessageAppended(message.clone()));
                    message
                }
            };
            self.set_status(&mut state, ChatStatus::Done);
            message
        };

        if let Err(e) = self
            .inner
            .deps
            .store
            .create_message(&self.inner.thread_id, &message)
            .await
        {
            warn!(thread_id = %self.inner.thread_id, message_id = %message.id, error = %e, "failed to store assistant message");
        }
        Ok(TurnOutcome::Completed(message))
    }

    async fn fail(&self, generation: u64, message: String) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            return;
        }
        warn!(thread_id = %self.inner.thread_id, error = %message, "turn failed");
        state.cancel = None;
        state.streaming_id = None;
        state.error = Some(message.clone());
        self.emit(SessionEvent::Error(message));
        self.set_status(&mut state, ChatStatus::Error);
    }

    async fn apply_title(&self, outcome: TitleOutcome) {
        match outcome {
            TitleOutcome::Committed { title, source } => {
                debug!(thread_id = %self.inner.thread_id, ?source, "title committed");
                self.inner.state.lock().await.title = Some(title.clone());
                self.emit(SessionEvent::TitleUpdated(title));
            }
            TitleOutcome::Abandoned => {}
            TitleOutcome::Failed { notice } => self.emit(SessionEvent::Notice(notice)),
        }
    }
}

struct Turn {
    generation: u64,
    cancel: CancellationToken,
    credential: Option<CredentialHeader>,
    request: ChatApiRequest,
}

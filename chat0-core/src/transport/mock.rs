//! Scripted transport for testing
//!
//! MockTransport replays queued chat responses and completions, and records
//! every request it receives, enabling deterministic tests of session and
//! title logic without a server.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ChatTransport, CompletionTransport, CredentialHeader, EventStream, TransportError};
use crate::protocol::{ChatApiRequest, SummaryRequest, UiStreamEvent};

/// One scripted chat response.
pub enum MockChat {
    /// Emit these events, then end the stream.
    Events(Vec<UiStreamEvent>),
    /// Fail to open the stream.
    Reject(TransportError),
    /// Forward whatever the test pushes through the paired sender.
    Live(mpsc::UnboundedReceiver<Result<UiStreamEvent, TransportError>>),
}

#[derive(Default)]
struct Script {
    chats: VecDeque<MockChat>,
    completions: VecDeque<Result<String, TransportError>>,
    chat_requests: Vec<(ChatApiRequest, Option<CredentialHeader>)>,
    completion_requests: Vec<(SummaryRequest, Option<CredentialHeader>)>,
}

/// Mock implementation of both transports
///
/// Each `open()` consumes one queued [`MockChat`]; each `complete()` consumes
/// one queued completion result.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a chat response.
    pub fn queue_chat(&self, chat: MockChat) {
        self.script().chats.push_back(chat);
    }

    /// Queue a chat response that streams these events.
    pub fn queue_events(&self, events: Vec<UiStreamEvent>) {
        self.queue_chat(MockChat::Events(events));
    }

    /// Queue a live chat response and return the sender that feeds it.
    pub fn queue_live(&self) -> mpsc::UnboundedSender<Result<UiStreamEvent, TransportError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue_chat(MockChat::Live(rx));
        tx
    }

    /// Queue a completion result.
    pub fn queue_completion(&self, result: Result<String, TransportError>) {
        self.script().completions.push_back(result);
    }

    /// Chat requests received so far.
    pub fn chat_requests(&self) -> Vec<(ChatApiRequest, Option<CredentialHeader>)> {
        self.script().chat_requests.clone()
    }

    /// Completion requests received so far.
    pub fn completion_requests(&self) -> Vec<(SummaryRequest, Option<CredentialHeader>)> {
        self.script().completion_requests.clone()
    }
}

/// The event sequence of a successful text response.
pub fn text_response(message_id: &str, chunks: &[&str]) -> Vec<UiStreamEvent> {
    let mut events = vec![
        UiStreamEvent::Start {
            message_id: Some(message_id.to_string()),
        },
        UiStreamEvent::StartStep,
        UiStreamEvent::TextStart { id: "t0".into() },
    ];
    events.extend(chunks.iter().map(|chunk| UiStreamEvent::TextDelta {
        id: "t0".into(),
        delta: chunk.to_string(),
    }));
    events.extend([
        UiStreamEvent::TextEnd { id: "t0".into() },
        UiStreamEvent::FinishStep,
        UiStreamEvent::Finish {
            finish_reason: Some("stop".into()),
        },
    ]);
    events
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(
        &self,
        request: ChatApiRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<EventStream, TransportError> {
        let next = {
            let mut script = self.script();
            script.chat_requests.push((request, credential));
            script.chats.pop_front()
        };

        match next {
            Some(MockChat::Events(events)) => {
                Ok(Box::pin(tokio_stream::iter(events.into_iter().map(Ok::<_, TransportError>))))
            }
            Some(MockChat::Reject(err)) => Err(err),
            Some(MockChat::Live(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            None => Err(TransportError::Connect("no scripted chat response".into())),
        }
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn complete(
        &self,
        request: SummaryRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<String, TransportError> {
        let mut script = self.script();
        script.completion_requests.push((request, credential));
        script
            .completions
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted completion".into())))
    }
}

//! Provider chunks to UI message stream events

use chat0_core::UiStreamEvent;
use chat0_core::protocol::finish_reason;
use chat0_models::providers::StopReason;

/// Output channel of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Text,
    Reasoning,
}

/// Frames deltas into start/delta/end blocks.
///
/// A block stays open while consecutive deltas share a channel; switching
/// channel closes it and opens a new one with a fresh id.
#[derive(Debug)]
pub struct UiStreamEncoder {
    message_id: String,
    open: Option<(Channel, String)>,
    next_block: usize,
}

impl UiStreamEncoder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            open: None,
            next_block: 0,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Events that open the response.
    pub fn start(&self) -> Vec<UiStreamEvent> {
        vec![
            UiStreamEvent::Start {
                message_id: Some(self.message_id.clone()),
            },
            UiStreamEvent::StartStep,
        ]
    }

    pub fn delta(&mut self, channel: Channel, delta: String) -> Vec<UiStreamEvent> {
        let mut events = Vec::with_capacity(3);
        let id = match &self.open {
            Some((open, id)) if *open == channel => id.clone(),
            _ => {
                events.extend(self.close());
                let id = self.open_block(channel);
                events.push(match channel {
                    Channel::Text => UiStreamEvent::TextStart { id: id.clone() },
                    Channel::Reasoning => UiStreamEvent::ReasoningStart { id: id.clone() },
                });
                id
            }
        };
        events.push(match channel {
            Channel::Text => UiStreamEvent::TextDelta { id, delta },
            Channel::Reasoning => UiStreamEvent::ReasoningDelta { id, delta },
        });
        events
    }

    /// Events that close the response normally.
    pub fn finish(&mut self, stop: Option<StopReason>) -> Vec<UiStreamEvent> {
        let mut events = self.close();
        events.push(UiStreamEvent::FinishStep);
        events.push(UiStreamEvent::Finish {
            finish_reason: stop.map(|reason| finish_reason(reason).to_string()),
        });
        events
    }

    /// Events that end the response with an error.
    pub fn error(&mut self, text: String) -> Vec<UiStreamEvent> {
        let mut events = self.close();
        events.push(UiStreamEvent::Error { error_text: text });
        events
    }

    fn open_block(&mut self, channel: Channel) -> String {
        let id = format!("{}-{}", self.message_id, self.next_block);
        self.next_block += 1;
        self.open = Some((channel, id.clone()));
        id
    }

    fn close(&mut self) -> Vec<UiStreamEvent> {
        match self.open.take() {
            Some((Channel::Text, id)) => vec![UiStreamEvent::TextEnd { id }],
            Some((Channel::Reasoning, id)) => vec![UiStreamEvent::ReasoningEnd { id }],
            None => Vec::new(),
        }
    }
}

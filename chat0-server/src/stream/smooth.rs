//! Word-level output smoothing
//!
//! Deltas are buffered and released one word at a time, where a word is a
//! run of non-whitespace followed by its trailing whitespace. Only the open
//! channel is buffered; a delta on the other channel releases the remainder
//! first, so pieces come out in arrival order.

use super::encoder::Channel;

#[derive(Debug, Default)]
pub struct WordSmoother {
    channel: Option<Channel>,
    buffer: String,
}

impl WordSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a delta and return the pieces ready to send.
    pub fn push(&mut self, channel: Channel, delta: &str) -> Vec<(Channel, String)> {
        let mut ready = Vec::new();
        if self.channel.is_some_and(|open| open != channel) {
            ready.extend(self.flush());
        }
        self.channel = Some(channel);
        self.buffer.push_str(delta);

        while let Some(end) = word_end(&self.buffer) {
            let rest = self.buffer.split_off(end);
            ready.push((channel, std::mem::replace(&mut self.buffer, rest)));
        }
        ready
    }

    /// Release whatever is buffered.
    pub fn flush(&mut self) -> Option<(Channel, String)> {
        let channel = self.channel.take()?;
        if self.buffer.is_empty() {
            return None;
        }
        Some((channel, std::mem::take(&mut self.buffer)))
    }
}

/// Byte offset just past the first complete word, if one is buffered.
///
/// Leading whitespace belongs to the word that follows it.
fn word_end(buffer: &str) -> Option<usize> {
    let word_start = buffer.find(|c: char| !c.is_whitespace())?;
    let after_word = word_start + buffer[word_start..].find(char::is_whitespace)?;
    let trailing = &buffer[after_word..];
    let next_word = trailing.find(|c: char| !c.is_whitespace())?;
    Some(after_word + next_word)
}

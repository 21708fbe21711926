//! Response pump for `/api/chat`
//!
//! One task per request drives the provider stream, smooths and frames its
//! output, and feeds a bounded channel that backs the response body. The
//! task ends when the provider finishes, fails, times out, the server shuts
//! down, or the client goes away.

mod encoder;
mod smooth;

use std::convert::Infallible;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use chat0_core::UiStreamEvent;
use chat0_core::protocol::DONE_FRAME;
use chat0_models::providers::{ChatModelHandle, ChatRequest, StopReason};

pub use encoder::{Channel, UiStreamEncoder};
pub use smooth::WordSmoother;

/// Frames buffered between the pump and the response body.
const CHANNEL_CAPACITY: usize = 64;

/// Body chunks consumed by the HTTP response.
pub type Frame = Result<String, Infallible>;

/// Limits applied to one response.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    pub timeout: Duration,
    pub smoothing_delay: Duration,
}

/// Text shown to the client for a provider failure.
pub fn error_text(err: &chat0_models::Error) -> String {
    match err {
        chat0_models::Error::ProviderApi(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Marker for a client that stopped reading.
struct Disconnected;

/// Why a response stopped before the provider finished.
enum Halt {
    Disconnected,
    TimedOut,
    ShuttingDown,
}

impl From<Disconnected> for Halt {
    fn from(_: Disconnected) -> Self {
        Halt::Disconnected
    }
}

struct Pump {
    tx: mpsc::Sender<Frame>,
    encoder: UiStreamEncoder,
    smoother: WordSmoother,
    smoothing_delay: Duration,
    deadline: Instant,
    shutdown: CancellationToken,
}

impl Pump {
    async fn send(&self, events: Vec<UiStreamEvent>) -> Result<(), Disconnected> {
        for event in events {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "failed to encode stream event");
                    continue;
                }
            };
            trace!(frame = %frame.trim_end(), "stream frame");
            self.tx.send(Ok(frame)).await.map_err(|_| Disconnected)?;
        }
        Ok(())
    }

    /// Send pieces one by one, pausing between them.
    async fn release(&mut self, pieces: Vec<(Channel, String)>) -> Result<(), Halt> {
        for (channel, piece) in pieces {
            let events = self.encoder.delta(channel, piece);
            self.send(events).await?;
            if !self.smoothing_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.smoothing_delay) => {}
                    _ = tokio::time::sleep_until(self.deadline) => return Err(Halt::TimedOut),
                    _ = self.shutdown.cancelled() => return Err(Halt::ShuttingDown),
                    _ = self.tx.closed() => return Err(Halt::Disconnected),
                }
            }
        }
        Ok(())
    }

    async fn push(&mut self, channel: Channel, delta: &str) -> Result<(), Halt> {
        let pieces = self.smoother.push(channel, delta);
        self.release(pieces).await
    }

    async fn finish(&mut self, stop: Option<StopReason>) -> Result<(), Halt> {
        let pieces: Vec<_> = self.smoother.flush().into_iter().collect();
        self.release(pieces).await?;
        let events = self.encoder.finish(stop);
        Ok(self.send(events).await?)
    }

    /// End the response with an error; buffered text goes out unpaced.
    async fn fail(&mut self, text: String) -> Result<(), Disconnected> {
        for (channel, piece) in self.smoother.flush() {
            let events = self.encoder.delta(channel, piece);
            self.send(events).await?;
        }
        let events = self.encoder.error(text);
        self.send(events).await
    }

    async fn run(
        &mut self,
        handle: ChatModelHandle,
        request: ChatRequest,
        timeout: Duration,
    ) -> Result<(), Disconnected> {
        match self.drive(handle, request).await {
            Ok(()) => Ok(()),
            Err(Halt::Disconnected) => Err(Disconnected),
            Err(Halt::TimedOut) => {
                warn!(?timeout, "response exceeded time limit");
                self.fail(format!("Request timed out after {timeout:?}")).await
            }
            Err(Halt::ShuttingDown) => self.fail("server shutting down".into()).await,
        }
    }

    async fn drive(&mut self, handle: ChatModelHandle, request: ChatRequest) -> Result<(), Halt> {
        let start = self.encoder.start();
        self.send(start).await?;

        let deadline = tokio::time::sleep_until(self.deadline);
        tokio::pin!(deadline);
        let shutdown = self.shutdown.clone();

        let mut stream = tokio::select! {
            opened = handle.stream(request) => match opened {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "provider request failed");
                    return Ok(self.fail(error_text(&e)).await?);
                }
            },
            _ = &mut deadline => return Err(Halt::TimedOut),
            _ = self.tx.closed() => return Err(Halt::Disconnected),
            _ = shutdown.cancelled() => return Err(Halt::ShuttingDown),
        };

        let mut stop = None;
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = &mut deadline => return Err(Halt::TimedOut),
                _ = self.tx.closed() => return Err(Halt::Disconnected),
                _ = shutdown.cancelled() => return Err(Halt::ShuttingDown),
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Some(reasoning) = chunk.reasoning {
                        self.push(Channel::Reasoning, &reasoning).await?;
                    }
                    if let Some(delta) = chunk.delta {
                        self.push(Channel::Text, &delta).await?;
                    }
                    if chunk.stop_reason.is_some() {
                        stop = chunk.stop_reason;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "provider stream failed");
                    return Ok(self.fail(error_text(&e)).await?);
                }
                None => return self.finish(stop).await,
            }
        }
    }
}

/// Spawn the pump for one response and return the body channel.
///
/// The stream opens with `start`, carries smoothed deltas, and ends with
/// either `finish` or a single `error` event, then `[DONE]`.
pub fn spawn_pump(
    handle: ChatModelHandle,
    request: ChatRequest,
    config: PumpConfig,
    shutdown: CancellationToken,
    tasks: &tokio_util::task::TaskTracker,
) -> mpsc::Receiver<Frame> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let message_id = uuid::Uuid::new_v4().to_string();
    let model = request.model.clone();

    tasks.spawn(async move {
        let mut pump = Pump {
            tx,
            encoder: UiStreamEncoder::new(message_id),
            smoother: WordSmoother::new(),
            smoothing_delay: config.smoothing_delay,
            deadline: Instant::now() + config.timeout,
            shutdown,
        };

        match pump.run(handle, request, config.timeout).await {
            Ok(()) => {
                let _ = pump.tx.send(Ok(DONE_FRAME.to_string())).await;
                debug!(model = %model, message_id = %pump.encoder.message_id(), "response complete");
            }
            Err(Disconnected) => {
                debug!(model = %model, "client disconnected, response abandoned");
            }
        }
    });

    rx
}

//! Thread titles and message summaries.
//!
//! A summary is requested from the server's completion endpoint; when that
//! fails or comes back empty, a title is derived locally from the prompt.
//! Either way it is written through [`commit_title`].

use std::sync::Arc;

use tracing::{debug, error, warn};

use chat0_models::auth::CredentialSource;
use chat0_models::ModelDescriptor;

use crate::protocol::SummaryRequest;
use crate::store::{ChatStore, StoreError};
use crate::transport::{CompletionTransport, CredentialHeader};

/// Longest fallback title, in characters.
pub const FALLBACK_TITLE_MAX_CHARS: usize = 80;

/// Notice shown when no summary could be produced.
pub const SUMMARY_FAILED_NOTICE: &str = "Failed to generate a summary for the message";

/// Derive a title from the prompt text alone.
///
/// Whitespace runs collapse to one space, the result is trimmed and cut to
/// [`FALLBACK_TITLE_MAX_CHARS`], then trailing whitespace and `-_,.;:!?#`
/// are stripped.
///
/// ```
/// use chat0_core::title::fallback_title;
///
/// assert_eq!(fallback_title("   Plan my   trip to Kyoto!!   "), "Plan my trip to Kyoto");
/// assert_eq!(fallback_title("?!"), "");
/// ```
pub fn fallback_title(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(FALLBACK_TITLE_MAX_CHARS).collect();
    truncated
        .trim_end_matches(|c: char| c.is_whitespace() || "-_,.;:!?#".contains(c))
        .to_string()
}

/// Write a summary, and the thread title when `is_title` is set.
///
/// The thread title is updated before the summary is recorded.
pub async fn commit_title(
    store: &dyn ChatStore,
    thread_id: &str,
    message_id: &str,
    title: &str,
    is_title: bool,
) -> Result<(), StoreError> {
    if is_title {
        store.update_thread(thread_id, title).await?;
    }
    store
        .create_message_summary(thread_id, message_id, title)
        .await
}

/// Where a committed title came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Server,
    Fallback,
}

/// Result of one derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// A title was written.
    Committed { title: String, source: TitleSource },
    /// Nothing usable to write; not an error.
    Abandoned,
    /// Nothing could be written; the notice is for display.
    Failed { notice: String },
}

/// Requests summaries and commits the result, degrading to a local title.
#[derive(Clone)]
pub struct TitleDeriver {
    transport: Arc<dyn CompletionTransport>,
    store: Arc<dyn ChatStore>,
    credentials: Arc<dyn CredentialSource>,
    summary_model: ModelDescriptor,
}

impl TitleDeriver {
    /// `summary_model` decides which credential accompanies the request.
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        store: Arc<dyn ChatStore>,
        credentials: Arc<dyn CredentialSource>,
        summary_model: ModelDescriptor,
    ) -> Self {
        Self {
            transport,
            store,
            credentials,
            summary_model,
        }
    }

    fn credential(&self) -> Option<CredentialHeader> {
        self.credentials
            .get_key(&self.summary_model.provider)
            .map(|key| {
                CredentialHeader::new(&self.summary_model.credential_header, key.expose_secret())
            })
    }

    /// Request a summary for `request.prompt` and commit it.
    pub async fn derive(&self, request: SummaryRequest) -> TitleOutcome {
        let thread_id = request.thread_id.clone();
        let message_id = request.message_id.clone();
        let is_title = request.is_title;
        let prompt = request.prompt.clone();

        match self.transport.complete(request, self.credential()).await {
            Ok(text) => {
                let server = text.trim();
                let (title, source) = if server.is_empty() {
                    (fallback_title(&prompt), TitleSource::Fallback)
                } else {
                    (server.to_string(), TitleSource::Server)
                };

                if title.is_empty() {
                    debug!(thread_id = %thread_id, "no title generated and no fallback available");
                    return TitleOutcome::Abandoned;
                }

                match commit_title(self.store.as_ref(), &thread_id, &message_id, &title, is_title)
                    .await
                {
                    Ok(()) => return TitleOutcome::Committed { title, source },
                    Err(e) => warn!(thread_id = %thread_id, error = %e, "failed to store summary"),
                }
            }
            Err(e) => warn!(thread_id = %thread_id, error = %e, "summary request failed"),
        }

        self.commit_fallback(&prompt, &thread_id, &message_id, is_title)
            .await
    }

    async fn commit_fallback(
        &self,
        prompt: &str,
        thread_id: &str,
        message_id: &str,
        is_title: bool,
    ) -> TitleOutcome {
        let title = fallback_title(prompt);
        if title.is_empty() {
            error!(thread_id, "no summary and no fallback could be applied");
            return TitleOutcome::Failed {
                notice: SUMMARY_FAILED_NOTICE.to_string(),
            };
        }

        match commit_title(self.store.as_ref(), thread_id, message_id, &title, is_title).await {
            Ok(()) => TitleOutcome::Committed {
                title,
                source: TitleSource::Fallback,
            },
            Err(e) => {
                error!(thread_id, error = %e, "failed to store fallback summary");
                TitleOutcome::Failed {
                    notice: SUMMARY_FAILED_NOTICE.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chat0_models::ProviderKind;
    use chat0_models::auth::StaticCredentials;

    use super::*;
    use crate::store::SqliteChatStore;
    use crate::transport::{MockTransport, TransportError};

    #[test]
    fn fallback_collapses_and_strips() {
        assert_eq!(fallback_title("   Plan my   trip to Kyoto!!   "), "Plan my trip to Kyoto");
        assert_eq!(fallback_title("what is rust?\n\n"), "what is rust");
        assert_eq!(fallback_title("tabs\tand\nnewlines -_#"), "tabs and newlines");
        assert_eq!(fallback_title(""), "");
        assert_eq!(fallback_title(" ... "), "");
    }

    #[test]
    fn fallback_truncates_before_stripping() {
        let prompt = format!("{}. more words", "a".repeat(79));
        assert_eq!(fallback_title(&prompt), "a".repeat(79));

        let long = "word ".repeat(40);
        let title = fallback_title(&long);
        assert!(title.chars().count() <= FALLBACK_TITLE_MAX_CHARS);
        assert!(!title.ends_with(' '));
    }

    #[test]
    fn fallback_counts_characters_not_bytes() {
        let prompt = "é".repeat(100);
        assert_eq!(fallback_title(&prompt).chars().count(), 80);
    }

    struct Fixture {
        transport: Arc<MockTransport>,
        store: Arc<SqliteChatStore>,
        deriver: TitleDeriver,
    }

    async fn fixture(credentials: StaticCredentials) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(SqliteChatStore::open_in_memory().unwrap());
        store.create_thread("t1").await.unwrap();
        let deriver = TitleDeriver::new(
            transport.clone(),
            store.clone(),
            Arc::new(credentials),
            ModelDescriptor::new("Gemini 2.5 Flash", ProviderKind::Google, "gemini-2.5-flash"),
        );
        Fixture {
            transport,
            store,
            deriver,
        }
    }

    fn request(prompt: &str, is_title: bool) -> SummaryRequest {
        SummaryRequest {
            prompt: prompt.to_string(),
            thread_id: "t1".into(),
            message_id: "m1".into(),
            is_title,
        }
    }

    #[tokio::test]
    async fn server_title_is_trimmed_and_committed() {
        let f = fixture(StaticCredentials::new().with_key("google", "g-key")).await;
        f.transport.queue_completion(Ok("  Kyoto Itinerary \n".into()));

        let outcome = f.deriver.derive(request("Plan my trip", true)).await;

        assert_eq!(
            outcome,
            TitleOutcome::Committed {
                title: "Kyoto Itinerary".into(),
                source: TitleSource::Server
            }
        );
        let thread = f.store.get_thread("t1").await.unwrap().unwrap();
        assert_eq!(thread.title.as_deref(), Some("Kyoto Itinerary"));
        assert_eq!(f.store.list_message_summaries("t1").await.unwrap().len(), 1);

        let (_, credential) = &f.transport.completion_requests()[0];
        assert_eq!(
            credential,
            &Some(CredentialHeader::new("X-Google-API-Key", "g-key"))
        );
    }

    #[tokio::test]
    async fn empty_server_text_uses_fallback() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport.queue_completion(Ok("   ".into()));

        let outcome = f.deriver.derive(request("  Plan my   trip!! ", true)).await;

        assert_eq!(
            outcome,
            TitleOutcome::Committed {
                title: "Plan my trip".into(),
                source: TitleSource::Fallback
            }
        );
        assert!(f.transport.completion_requests()[0].1.is_none());
    }

    #[tokio::test]
    async fn empty_server_text_and_empty_prompt_abandons() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport.queue_completion(Ok(String::new()));

        let outcome = f.deriver.derive(request("?!", true)).await;

        assert_eq!(outcome, TitleOutcome::Abandoned);
        assert!(f.store.list_message_summaries("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_failure_commits_fallback() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport.queue_completion(Err(TransportError::Rejected {
            status: 401,
            message: "API key not found".into(),
        }));

        let outcome = f.deriver.derive(request("Plan my trip to Kyoto!!", true)).await;

        assert_eq!(
            outcome,
            TitleOutcome::Committed {
                title: "Plan my trip to Kyoto".into(),
                source: TitleSource::Fallback
            }
        );
        let thread = f.store.get_thread("t1").await.unwrap().unwrap();
        assert_eq!(thread.title.as_deref(), Some("Plan my trip to Kyoto"));
    }

    #[tokio::test]
    async fn request_failure_without_fallback_is_a_notice() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport
            .queue_completion(Err(TransportError::Connect("refused".into())));

        let outcome = f.deriver.derive(request("   ", true)).await;

        assert_eq!(
            outcome,
            TitleOutcome::Failed {
                notice: SUMMARY_FAILED_NOTICE.into()
            }
        );
    }

    #[tokio::test]
    async fn non_title_summary_leaves_thread_untitled() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport.queue_completion(Ok("Follow-up".into()));

        f.deriver.derive(request("and then?", false)).await;

        assert!(f.store.get_thread("t1").await.unwrap().unwrap().title.is_none());
        assert_eq!(f.store.list_message_summaries("t1").await.unwrap()[0].content, "Follow-up");
    }

    #[tokio::test]
    async fn commit_failure_is_reported_as_notice() {
        let f = fixture(StaticCredentials::new()).await;
        f.transport.queue_completion(Ok("Title".into()));

        let mut req = request("Plan", true);
        req.thread_id = "missing".into();
        let outcome = f.deriver.derive(req).await;

        assert_eq!(
            outcome,
            TitleOutcome::Failed {
                notice: SUMMARY_FAILED_NOTICE.into()
            }
        );
    }
}

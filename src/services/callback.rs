use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::db::Repository;
use crate::digest::{Digest, DigestSection, OrderedMultimap};
use crate::error::{AppError, Result};
use crate::index::IndexService;
use crate::mail::{MailTemplates, MailTransport, OutboundEmail};
use crate::models::{CallbackPayload, IndexObject, MatchEvent};

use super::present;

const MAX_CONCURRENT_FETCHES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Sent { sections: usize },
    /// The batch carried no matches, so nothing was sent.
    Empty,
    /// The digest was rendered but the transport rejected it.
    SendFailed,
}

pub struct CallbackService {
    repository: Arc<Repository>,
    index: Arc<dyn IndexService>,
    mailer: Arc<dyn MailTransport>,
    templates: Arc<MailTemplates>,
    mail_from: String,
}

impl CallbackService {
    pub fn new(
        repository: Arc<Repository>,
        index: Arc<dyn IndexService>,
        mailer: Arc<dyn MailTransport>,
        templates: Arc<MailTemplates>,
        mail_from: String,
    ) -> Self {
        Self {
            repository,
            index,
            mailer,
            templates,
            mail_from,
        }
    }

    /// Turns one batch of trigger matches into a single digest email.
    pub async fn ingest(&self, payload: CallbackPayload) -> Result<CallbackOutcome> {
        let trigger_id = present(payload.trigger_id.as_deref());
        let (Some(trigger_id), Some(matches)) = (trigger_id, payload.matches) else {
            return Err(AppError::validation("Missing triggerId or matches"));
        };

        let Some(alert) = self.repository.get_alert(trigger_id).await? else {
            tracing::warn!("No trigger found for triggerId {}", trigger_id);
            return Err(AppError::NotFound(format!("Unknown trigger {}", trigger_id)));
        };

        let groups: OrderedMultimap<String, String> = matches
            .into_iter()
            .map(|m: MatchEvent| {
                tracing::debug!("Match on {} scored {:.3}", m.object_id, m.score);
                (m.object_id, m.content)
            })
            .collect();

        if groups.is_empty() {
            tracing::debug!("Empty match batch for trigger {}", trigger_id);
            return Ok(CallbackOutcome::Empty);
        }
        tracing::debug!("Trigger {} matched {} objects", trigger_id, groups.len());

        let objects = self.fetch_objects(&groups).await;

        let sections = groups
            .into_iter()
            .zip(objects)
            .map(|((object_id, snippets), object)| {
                DigestSection::new(&object_id, object.as_ref(), snippets)
            })
            .collect::<Vec<_>>();
        let section_count = sections.len();

        let digest = Digest {
            feed_url: alert.feed_url,
            sections,
        };
        let rendered = self.templates.digest(&digest)?;
        let email = OutboundEmail {
            from: self.mail_from.clone(),
            to: alert.destination_email,
            subject: rendered.subject,
            html_body: rendered.html_body,
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                tracing::info!("Sent digest for trigger {} to {}", trigger_id, email.to);
                Ok(CallbackOutcome::Sent {
                    sections: section_count,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to send digest for trigger {}: {}", trigger_id, e);
                Ok(CallbackOutcome::SendFailed)
            }
        }
    }

    /// Fetches each distinct object once. Results line up with the map's key
    /// order regardless of which request finishes first.
    async fn fetch_objects(
        &self,
        groups: &OrderedMultimap<String, String>,
    ) -> Vec<Option<IndexObject>> {
        let object_ids = groups.keys().cloned().collect::<Vec<String>>();
        stream::iter(object_ids)
            .map(|object_id| async move {
                match self.index.get_object(&object_id).await {
                    Ok(object) => Some(object),
                    Err(e) => {
                        tracing::warn!("Failed to fetch object {}: {}", object_id, e);
                        None
                    }
                }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::Alert;
    use crate::testing::{DelayedIndex, FakeIndex, FakeMailer};

    fn event(object_id: &str, content: &str) -> MatchEvent {
        MatchEvent {
            content: content.to_string(),
            object_id: object_id.to_string(),
            score: 0.8,
        }
    }

    fn seeded_index() -> Arc<FakeIndex> {
        let index = FakeIndex::new();
        index.add_item("o1", "First post", "https://example.com/1");
        index.add_item("o2", "Second post", "https://example.com/2");
        index
    }

    async fn service_with(index: Arc<dyn IndexService>) -> (CallbackService, Arc<FakeMailer>) {
        let repository = Arc::new(Repository::open_in_memory().await.unwrap());
        repository
            .insert_alert(Alert {
                feed_url: "https://example.com/rss".to_string(),
                trigger_id: "t1".to_string(),
                destination_email: "a@x.com".to_string(),
                query: "rust".to_string(),
            })
            .await
            .unwrap();

        let mailer = FakeMailer::new();
        let service = CallbackService::new(
            repository,
            index,
            mailer.clone(),
            Arc::new(MailTemplates::new().unwrap()),
            "alerts@example.com".to_string(),
        );
        (service, mailer)
    }

    async fn setup() -> (CallbackService, Arc<FakeIndex>, Arc<FakeMailer>) {
        let index = seeded_index();
        let (service, mailer) = service_with(index.clone()).await;
        (service, index, mailer)
    }

    fn payload(trigger_id: &str, matches: Vec<MatchEvent>) -> CallbackPayload {
        CallbackPayload {
            trigger_id: Some(trigger_id.to_string()),
            matches: Some(matches),
        }
    }

    #[tokio::test]
    async fn groups_matches_by_object_in_first_seen_order() {
        let (service, index, mailer) = setup().await;

        let outcome = service
            .ingest(payload(
                "t1",
                vec![event("o1", "c1"), event("o2", "c2"), event("o1", "c3")],
            ))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Sent { sections: 2 });

        let mut fetches = index.fetches();
        fetches.sort();
        assert_eq!(fetches, vec!["o1", "o2"]);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.to, "a@x.com");
        assert_eq!(email.from, "alerts@example.com");
        assert_eq!(email.subject, "New content matches for https://example.com/rss");

        let html = &email.html_body;
        assert!(html.contains("<pre>https://example.com/rss</pre>"));
        assert!(html.contains("<a href=\"https://example.com/1\">First post</a>:</p>"));
        assert!(html.contains("<ul><li>c1</li><li>c3</li></ul>"));
        assert!(html.find("First post").unwrap() < html.find("Second post").unwrap());
    }

    #[tokio::test]
    async fn section_order_follows_matches_not_fetch_completion() {
        let inner = seeded_index();
        let index = DelayedIndex::new(
            inner.clone(),
            &[
                ("o1", Duration::from_millis(200)),
                ("o2", Duration::from_millis(1)),
            ],
        );
        let (service, mailer) = service_with(index).await;

        service
            .ingest(payload(
                "t1",
                vec![event("o1", "c1"), event("o2", "c2"), event("o1", "c3")],
            ))
            .await
            .unwrap();

        assert_eq!(inner.fetches(), vec!["o2", "o1"]);

        let html = &mailer.sent()[0].html_body;
        let first = html.find("First post").unwrap();
        let second = html.find("Second post").unwrap();
        assert!(first < second);
        assert!(html[first..second].contains("<li>c1</li><li>c3</li>"));
        assert!(!html[first..second].contains("c2"));
    }

    #[tokio::test]
    async fn unknown_trigger_is_not_found_and_sends_nothing() {
        let (service, index, mailer) = setup().await;

        let err = service
            .ingest(payload("nope", vec![event("o1", "c1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(mailer.sent().is_empty());
        assert!(index.fetches().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (service, _, mailer) = setup().await;

        let no_matches = CallbackPayload {
            trigger_id: Some("t1".to_string()),
            matches: None,
        };
        assert!(matches!(
            service.ingest(no_matches).await,
            Err(AppError::Validation(_))
        ));

        let blank_trigger = payload("", vec![event("o1", "c1")]);
        assert!(matches!(
            service.ingest(blank_trigger).await,
            Err(AppError::Validation(_))
        ));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let (service, _, mailer) = setup().await;
        let outcome = service.ingest(payload("t1", vec![])).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Empty);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_object_still_produces_section() {
        let (service, _, mailer) = setup().await;

        service
            .ingest(payload("t1", vec![event("gone", "c1"), event("o2", "c2")]))
            .await
            .unwrap();

        let html = &mailer.sent()[0].html_body;
        assert!(html.contains("<p>gone:</p>"));
        assert!(html.contains("<ul><li>c1</li></ul>"));
        assert!(html.find("gone").unwrap() < html.find("Second post").unwrap());
    }

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let (service, _, mailer) = setup().await;
        mailer.fail.store(true, Ordering::SeqCst);

        let outcome = service
            .ingest(payload("t1", vec![event("o1", "c1")]))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::SendFailed);
    }
}

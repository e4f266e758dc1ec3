//! SNS notification endpoint.
//!
//! Pipeline per request, each step short-circuiting:
//! 1. Decode the SNS envelope (body capped at [`MAX_BODY_BYTES`])
//! 2. Follow subscription confirmations, reject unknown envelope types
//! 3. Decode the SES payload embedded in `Message`
//! 4. Ignore anything but bounces and complaints
//! 5. Resolve the sender queue (exact, then wildcard)
//! 6. Offer every selected recipient to the queue without blocking
//!
//! Everything past envelope validation answers `204 No Content`, whatever
//! happens to the individual recipients.

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;

use bounce_common::error::AppError;
use bounce_common::types::{Envelope, EnvelopeKind, SesNotification};
use bounce_engine::registry::{Offer, SenderQueue};

use crate::confirm::is_trusted_url;
use crate::state::AppState;

/// Largest request body read before decoding.
pub const MAX_BODY_BYTES: usize = 2 << 20;

/// How many recipients of one notification reached the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub queued: usize,
    pub dropped: usize,
}

/// Any method, any path: handle one SNS delivery.
pub async fn handle_notification(
    State(state): State<AppState>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::Decode(format!("request body: {}", e)))
        .inspect_err(log_rejection)?;

    let envelope = Envelope::decode(&body).inspect_err(log_rejection)?;

    match envelope.kind() {
        EnvelopeKind::SubscriptionConfirmation => {
            confirm_subscription(&state, envelope.subscribe_url.as_deref());
            return Ok(StatusCode::NO_CONTENT);
        }
        EnvelopeKind::Notification => {}
        EnvelopeKind::Unsupported => {
            let err = AppError::UnsupportedEnvelope(envelope.kind);
            log_rejection(&err);
            return Err(err);
        }
    }

    let payload = envelope.payload().inspect_err(log_rejection)?;

    if !payload.notification_type.is_actionable() {
        tracing::debug!(
            notification_type = %payload.notification_type,
            sender = %payload.mail.source,
            "Ignoring notification type"
        );
        return Ok(StatusCode::NO_CONTENT);
    }

    let sender = payload.mail.source.as_str();
    let Some(queue) = state.registry.resolve(sender) else {
        tracing::info!(sender, "Unconfigured sender");
        return Ok(StatusCode::NO_CONTENT);
    };

    dispatch(queue, sender, &payload);
    Ok(StatusCode::NO_CONTENT)
}

/// Offer every remediable recipient of `payload` to `queue`.
///
/// Never waits for queue capacity: a full queue drops the address.
pub fn dispatch(queue: &SenderQueue, sender: &str, payload: &SesNotification) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for recipient in payload.recipients() {
        tracing::info!(
            from = sender,
            to = recipient.address,
            kind = %recipient.kind,
            reason = recipient.reason,
            "Recipient selected for remediation"
        );

        match queue.offer(recipient.address) {
            Offer::Queued => summary.queued += 1,
            Offer::Full => {
                summary.dropped += 1;
                tracing::warn!(
                    from = sender,
                    to = recipient.address,
                    queue = queue.sender(),
                    "Bounce queue overflow"
                );
            }
            Offer::Closed => {
                summary.dropped += 1;
                tracing::warn!(
                    from = sender,
                    to = recipient.address,
                    queue = queue.sender(),
                    "Bounce queue closed"
                );
            }
        }
    }

    if summary.queued == 0 && summary.dropped == 0 {
        tracing::debug!(
            from = sender,
            notification_type = %payload.notification_type,
            "No recipients to remediate"
        );
    }

    summary
}

/// Follow a trusted confirmation URL on a detached task.
///
/// The request never waits on the confirmation host: the caller gets its 204
/// whatever the outbound call does.
fn confirm_subscription(state: &AppState, url: Option<&str>) {
    let trusted_domain = state.config.confirm_trusted_domain.as_str();

    match url {
        Some(url) if is_trusted_url(url, trusted_domain) => {
            tracing::info!(url, "Following subscribe confirmation URL");
            let confirmer = state.confirmer.clone();
            let url = url.to_string();
            tokio::spawn(async move {
                if let Err(e) = confirmer.confirm(&url).await {
                    tracing::warn!(url = %url, error = %e, "Subscription confirmation failed");
                }
            });
        }
        Some(url) => {
            tracing::info!(url, trusted_domain, "Ignoring confirmation URL outside trusted domain");
        }
        None => {
            tracing::info!("Subscription confirmation without SubscribeURL");
        }
    }
}

fn log_rejection(err: &AppError) {
    tracing::warn!(error = %err, "Rejected notification");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    use bounce_common::types::{Bounce, BouncedRecipient, Mail, NotificationType};
    use bounce_engine::registry::SenderRegistry;
    use bounce_engine::remediation::Remediator;

    /// Never finishes, so the queue fills up behind the first address.
    struct Stalled(Arc<Mutex<Vec<String>>>);

    impl Remediator for Stalled {
        async fn remediate(&self, address: &str) -> Result<(), AppError> {
            self.0.lock().unwrap().push(address.to_string());
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn permanent_bounce(addresses: &[&str]) -> SesNotification {
        SesNotification {
            notification_type: NotificationType::Bounce,
            mail: Mail {
                source: "news@example.com".to_string(),
            },
            bounce: Some(Bounce {
                bounce_type: "Permanent".to_string(),
                bounced_recipients: addresses
                    .iter()
                    .map(|a| BouncedRecipient {
                        email_address: a.to_string(),
                        diagnostic_code: "550 5.1.1".to_string(),
                    })
                    .collect(),
            }),
            complaint: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_drops_on_overflow() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SenderRegistry::new(1);
        registry
            .register("news@example.com", Stalled(seen.clone()))
            .unwrap();
        let queue = registry.resolve("news@example.com").unwrap();

        let addresses: Vec<String> = (0..10).map(|i| format!("r{}@example.org", i)).collect();
        let refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
        let summary = dispatch(queue, "news@example.com", &permanent_bounce(&refs));

        assert_eq!(summary.queued + summary.dropped, 10);
        // Capacity 1 plus at most one address already held by the worker.
        assert!(summary.queued <= 2);
        assert!(summary.dropped >= 8);
    }

    #[tokio::test]
    async fn test_dispatch_nothing_for_transient_bounce() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SenderRegistry::new(10);
        registry
            .register("news@example.com", Stalled(seen.clone()))
            .unwrap();
        let queue = registry.resolve("news@example.com").unwrap();

        let mut payload = permanent_bounce(&["a@example.org"]);
        if let Some(bounce) = payload.bounce.as_mut() {
            bounce.bounce_type = "Transient".to_string();
        }

        assert_eq!(
            dispatch(queue, "news@example.com", &payload),
            DispatchSummary::default()
        );
    }
}

// Best-effort browser push. Delivery failures never reach callers: the one
// observable side effect is that subscriptions reported gone get dropped.
pub mod repository;
mod transport;

pub use transport::{PushOutcome, PushTransport, WebPushTransport};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::PushConfig;
use crate::db;
use crate::db::models::PushSubscription;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Subscription body as browsers produce it from
/// `PushManager.subscribe().toJSON()`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

pub struct Notifier {
    transport: Box<dyn PushTransport>,
    public_key: String,
}

impl Notifier {
    /// Build the production notifier. Fails fast on bad VAPID config so a
    /// misconfigured deployment dies at startup, not at first send.
    pub fn from_config(config: &PushConfig) -> AppResult<Notifier> {
        validate_vapid(config)?;
        Ok(Notifier {
            transport: Box::new(WebPushTransport::new(config.vapid_private_key.clone())),
            public_key: config.vapid_public_key.clone(),
        })
    }

    /// Notifier with a custom transport; tests inject a recording fake here.
    pub fn with_transport(transport: Box<dyn PushTransport>, public_key: String) -> Notifier {
        Notifier {
            transport,
            public_key,
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Register a browser endpoint for the user, then confirm with a push.
    /// Subscribing the same endpoint twice keeps the existing row.
    pub async fn subscribe(
        &self,
        pool: &DbPool,
        user_id: &str,
        req: &SubscriptionRequest,
    ) -> AppResult<()> {
        let subscription = {
            let conn = pool.get()?;
            match repository::find_by_endpoint(&conn, &req.endpoint)? {
                Some(existing) => {
                    tracing::info!("Subscription already exists for this endpoint");
                    existing
                }
                None => {
                    match repository::insert(
                        &conn,
                        &req.endpoint,
                        &req.keys.p256dh,
                        &req.keys.auth,
                        user_id,
                    ) {
                        Ok(()) => {}
                        // Lost a race against the same browser re-subscribing.
                        Err(e) if db::is_constraint_violation(&e) => {}
                        Err(e) => return Err(e.into()),
                    }
                    repository::find_by_endpoint(&conn, &req.endpoint)?.ok_or_else(|| {
                        AppError::Internal("subscription vanished after insert".into())
                    })?
                }
            }
        };

        let confirmation = payload("Subscribed!", "Device registered successfully.", "/");
        self.dispatch(pool, &subscription, &confirmation).await;
        Ok(())
    }

    pub fn verify_subscription(&self, pool: &DbPool, endpoint: &str) -> AppResult<bool> {
        let conn = pool.get()?;
        Ok(repository::find_by_endpoint(&conn, endpoint)?.is_some())
    }

    /// Push a payload to every endpoint the user registered. Best effort:
    /// the only error that changes state is "endpoint gone", which drops the
    /// subscription row.
    pub async fn send_to_user(&self, pool: &DbPool, user_id: &str, payload_json: &str) {
        let subscriptions = match pool
            .get()
            .map_err(AppError::from)
            .and_then(|conn| repository::list_for_user(&conn, user_id))
        {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!("Could not load push subscriptions: {}", e);
                return;
            }
        };

        if subscriptions.is_empty() {
            tracing::warn!("No push subscriptions found for user {}", user_id);
            return;
        }

        for subscription in &subscriptions {
            self.dispatch(pool, subscription, payload_json).await;
        }
    }

    async fn dispatch(&self, pool: &DbPool, subscription: &PushSubscription, payload_json: &str) {
        match self.transport.send(subscription, payload_json).await {
            PushOutcome::Delivered => {
                tracing::info!("Push sent to {}", subscription.endpoint);
            }
            PushOutcome::Gone => {
                tracing::warn!(
                    "Endpoint gone, removing subscription: {}",
                    subscription.endpoint
                );
                let result = pool
                    .get()
                    .map_err(AppError::from)
                    .and_then(|conn| repository::delete_by_endpoint(&conn, &subscription.endpoint));
                if let Err(e) = result {
                    tracing::error!("Could not remove dead subscription: {}", e);
                }
            }
            PushOutcome::Failed(reason) => {
                tracing::error!("Error sending push: {}", reason);
            }
        }
    }
}

/// The notification body format browsers' service workers expect here.
pub fn payload(title: &str, body: &str, url: &str) -> String {
    serde_json::json!({ "title": title, "body": body, "url": url }).to_string()
}

/// VAPID sanity checks: URL-safe base64 keys, 65-byte uncompressed EC point
/// for the public key, 32-byte scalar for the private key, mailto: subject.
fn validate_vapid(config: &PushConfig) -> AppResult<()> {
    if config.vapid_public_key.is_empty()
        || config.vapid_private_key.is_empty()
        || config.subject.is_empty()
    {
        return Err(AppError::Internal(
            "Missing VAPID properties (public key, private key, subject)".to_string(),
        ));
    }

    if !config.subject.starts_with("mailto:") || !config.subject.contains('@') {
        return Err(AppError::Internal(
            "VAPID subject must be in format 'mailto:user@example.com'".to_string(),
        ));
    }

    let public = URL_SAFE_NO_PAD
        .decode(&config.vapid_public_key)
        .map_err(|_| AppError::Internal("VAPID keys must be URL-safe base64".to_string()))?;
    if public.len() != 65 || public[0] != 0x04 {
        return Err(AppError::Internal(
            "VAPID public key must be a 65-byte uncompressed EC point".to_string(),
        ));
    }

    let private = URL_SAFE_NO_PAD
        .decode(&config.vapid_private_key)
        .map_err(|_| AppError::Internal("VAPID keys must be URL-safe base64".to_string()))?;
    if private.len() != 32 {
        return Err(AppError::Internal(
            "VAPID private key must be exactly 32 bytes".to_string(),
        ));
    }

    Ok(())
}

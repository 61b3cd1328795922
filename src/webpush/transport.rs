// The transport boundary: everything protocol-specific (VAPID signing,
// payload encryption, HTTP) stays behind this trait.
use async_trait::async_trait;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::db::models::PushSubscription;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The push service says this endpoint no longer exists; the caller
    /// should drop the subscription.
    Gone,
    Failed(String),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> PushOutcome;
}

/// Web Push protocol transport backed by the `web-push` crate.
pub struct WebPushTransport {
    client: HyperWebPushClient,
    vapid_private_key: String,
}

impl WebPushTransport {
    pub fn new(vapid_private_key: String) -> Self {
        Self {
            client: HyperWebPushClient::new(),
            vapid_private_key,
        }
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> PushOutcome {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let signature = match VapidSignatureBuilder::from_base64(
            &self.vapid_private_key,
            URL_SAFE_NO_PAD,
            &info,
        )
        .and_then(|builder| builder.build())
        {
            Ok(signature) => signature,
            Err(e) => return PushOutcome::Failed(format!("VAPID signature failed: {}", e)),
        };

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_vapid_signature(signature);

        let message = match builder.build() {
            Ok(message) => message,
            Err(e) => return PushOutcome::Failed(format!("message build failed: {}", e)),
        };

        match self.client.send(message).await {
            Ok(()) => PushOutcome::Delivered,
            Err(e) => match e.short_description() {
                "endpoint_not_valid" | "endpoint_not_found" => PushOutcome::Gone,
                _ => PushOutcome::Failed(e.to_string()),
            },
        }
    }
}

use crate::services::ports::{LikeNotification, MatchNotification, Notifier, NotifyError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Posts notifications to the push dispatcher's webhook
///
/// `{endpoint}/like` receives [`LikeNotification`], `{endpoint}/match`
/// receives [`MatchNotification`].
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), NotifyError> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        tracing::debug!(url = %url, "Notification delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify_like(&self, notification: &LikeNotification) -> Result<(), NotifyError> {
        self.post("like", notification).await
    }

    async fn notify_match(&self, notification: &MatchNotification) -> Result<(), NotifyError> {
        self.post("match", notification).await
    }
}

/// Used when no dispatcher endpoint is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_like(&self, notification: &LikeNotification) -> Result<(), NotifyError> {
        tracing::info!(
            target_id = %notification.target_id,
            liker_id = %notification.liker_id,
            super_like = notification.is_super_like,
            "Like notification"
        );
        Ok(())
    }

    async fn notify_match(&self, notification: &MatchNotification) -> Result<(), NotifyError> {
        tracing::info!(
            match_id = %notification.match_id,
            user_id = %notification.user_id,
            target_user_id = %notification.target_user_id,
            "Match notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn like_notification() -> LikeNotification {
        LikeNotification {
            target_id: "bob".to_string(),
            liker_id: "alice".to_string(),
            liker_name: "Alice".to_string(),
            photo_url: None,
            is_super_like: true,
        }
    }

    #[tokio::test]
    async fn test_like_is_posted_with_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/like")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "targetId": "bob",
                "likerId": "alice",
                "isSuperLike": true
            })))
            .with_status(202)
            .create_async()
            .await;

        let notifier = HttpNotifier::new(
            &format!("{}/", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();
        notifier.notify_like(&like_notification()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_match_notification_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/match")
            .with_status(503)
            .create_async()
            .await;

        let notifier = HttpNotifier::new(&server.url(), None, Duration::from_secs(2)).unwrap();
        let result = notifier
            .notify_match(&MatchNotification {
                match_id: Uuid::new_v4(),
                user_id: "alice".to_string(),
                target_user_id: "bob".to_string(),
                matched_at: Utc::now(),
            })
            .await;

        assert!(matches!(result, Err(NotifyError::Rejected(503))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify_like(&like_notification()).await.is_ok());
    }
}

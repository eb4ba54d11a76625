//! InMemory Notification Repository 実装

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Notification, NotificationRepository, RepositoryError, UserId};

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        if notifications.iter().any(|n| n.id == notification.id) {
            return Err(RepositoryError::Duplicate(notification.id.to_string()));
        }
        notifications.push(notification);
        Ok(())
    }

    /// 新しい順
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.lock().await;
        let mut found: Vec<Notification> = notifications
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

//! Audit log of verified gateway notifications.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::repository::WebhookEventLog;

pub struct PgWebhookEventLog {
    pool: PgPool,
}

impl PgWebhookEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventLog for PgWebhookEventLog {
    async fn record(
        &self,
        event_type: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<String, DatabaseError> {
        let event_id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO webhook_events (id, event_type, source, payload, processed, attempts, created_at) \
             VALUES ($1, $2, $3, $4, false, 0, NOW())",
        )
        .bind(&event_id)
        .bind(event_type)
        .bind(source)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(event_id)
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE webhook_events SET processed = true, processed_at = NOW() WHERE id = $1",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE webhook_events \
             SET attempts = attempts + 1, last_error = $2 \
             WHERE id = $1",
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }
}

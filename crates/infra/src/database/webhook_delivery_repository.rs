//! SQLite-backed webhook delivery audit and dedup

use std::sync::Arc;

use async_trait::async_trait;
use relaygate_core::{DeliveryClaim, WebhookDeliveryRepository};
use relaygate_domain::{ProviderType, Result as DomainResult, WebhookDelivery};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;

use super::manager::DbManager;
use super::support::{from_millis, map_join_error, parse_column, sql_error, to_millis};

pub struct SqliteWebhookDeliveryRepository {
    db: Arc<DbManager>,
}

impl SqliteWebhookDeliveryRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Most recent deliveries for an integration.
    pub async fn list_for_integration(
        &self,
        integration_id: &str,
        limit: u32,
    ) -> DomainResult<Vec<WebhookDelivery>> {
        let db = Arc::clone(&self.db);
        let integration_id = integration_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<WebhookDelivery>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, integration_id, workspace_id, provider_type, event_type, action,
                            external_event_id, raw_payload, received_at, processed,
                            error_message, retry_count
                     FROM webhook_deliveries
                     WHERE integration_id = ?1
                     ORDER BY received_at DESC, rowid DESC
                     LIMIT ?2",
                )
                .map_err(sql_error)?;
            let rows = stmt
                .query_map(params![integration_id, limit], map_delivery_row)
                .map_err(sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl WebhookDeliveryRepository for SqliteWebhookDeliveryRepository {
    async fn claim(&self, delivery: &WebhookDelivery) -> DomainResult<DeliveryClaim> {
        let db = Arc::clone(&self.db);
        let delivery = delivery.clone();

        task::spawn_blocking(move || -> DomainResult<DeliveryClaim> {
            let mut conn = db.get_connection()?;
            let tx =
                conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(sql_error)?;

            let claim = if insert_delivery(&tx, &delivery, true)? {
                DeliveryClaim::Claimed {
                    delivery_id: delivery.id.clone(),
                    attempt: delivery.retry_count,
                }
            } else {
                // Conflict on (provider, event id): re-claim only a failed attempt.
                // The claiming delivery replaces whatever a rejected request left.
                tx.query_row(
                    "UPDATE webhook_deliveries
                     SET processed = 1, retry_count = retry_count + 1, error_message = NULL,
                         received_at = ?3, integration_id = ?4, workspace_id = ?5,
                         event_type = ?6, action = ?7, raw_payload = ?8
                     WHERE provider_type = ?1 AND external_event_id = ?2 AND processed = 0
                     RETURNING id, retry_count",
                    params![
                        delivery.provider_type.as_str(),
                        delivery.external_event_id,
                        to_millis(delivery.received_at),
                        delivery.integration_id,
                        delivery.workspace_id,
                        delivery.event_type,
                        delivery.action,
                        delivery.raw_payload,
                    ],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
                )
                .optional()
                .map_err(sql_error)?
                .map_or(DeliveryClaim::Duplicate, |(delivery_id, attempt)| {
                    DeliveryClaim::Claimed { delivery_id, attempt }
                })
            };

            tx.commit().map_err(sql_error)?;
            Ok(claim)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn record_failure(&self, delivery: &WebhookDelivery) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let delivery = delivery.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_delivery(&conn, &delivery, false)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_failed(&self, delivery_id: &str, error_message: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let delivery_id = delivery_id.to_string();
        let error_message = error_message.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE webhook_deliveries SET processed = 0, error_message = ?2 WHERE id = ?1",
                params![delivery_id, error_message],
            )
            .map_err(sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Insert unless `(provider, event id)` already exists. Returns whether a row
/// was written.
fn insert_delivery(
    conn: &Connection,
    delivery: &WebhookDelivery,
    processed: bool,
) -> DomainResult<bool> {
    let inserted = conn
        .execute(
            "INSERT INTO webhook_deliveries (
                id, integration_id, workspace_id, provider_type, event_type, action,
                external_event_id, raw_payload, received_at, processed, error_message, retry_count
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT DO NOTHING",
            params![
                delivery.id,
                delivery.integration_id,
                delivery.workspace_id,
                delivery.provider_type.as_str(),
                delivery.event_type,
                delivery.action,
                delivery.external_event_id,
                delivery.raw_payload,
                to_millis(delivery.received_at),
                processed,
                delivery.error_message,
                delivery.retry_count,
            ],
        )
        .map_err(sql_error)?;
    Ok(inserted > 0)
}

fn map_delivery_row(row: &Row<'_>) -> rusqlite::Result<WebhookDelivery> {
    let provider: String = row.get(3)?;
    Ok(WebhookDelivery {
        id: row.get(0)?,
        integration_id: row.get(1)?,
        workspace_id: row.get(2)?,
        provider_type: parse_column::<ProviderType>(3, &provider)?,
        event_type: row.get(4)?,
        action: row.get(5)?,
        external_event_id: row.get(6)?,
        raw_payload: row.get(7)?,
        received_at: from_millis(row.get(8)?)?,
        processed: row.get(9)?,
        error_message: row.get(10)?,
        retry_count: row.get(11)?,
    })
}

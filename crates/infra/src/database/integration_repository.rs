//! SQLite-backed integration repository
//!
//! Token columns only ever hold vault ciphertext; this layer never sees
//! plaintext credentials.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaygate_core::IntegrationRepository;
use relaygate_domain::{
    GatewayError, Integration, IntegrationStatus, ProviderType, Result as DomainResult,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use tokio::task;

use super::manager::DbManager;
use super::support::{
    from_millis, map_join_error, opt_from_millis, opt_to_millis, parse_column, sql_error, to_millis,
};

const SELECT_COLUMNS: &str = "SELECT id, workspace_id, provider_type, status, external_account_id,
        external_account_name, external_org_id, external_org_name, scopes, access_token,
        refresh_token, token_type, token_expires_at, webhook_secret, created_by, created_at,
        updated_at, last_sync_at
     FROM integrations";

pub struct SqliteIntegrationRepository {
    db: Arc<DbManager>,
}

impl SqliteIntegrationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn query_many<P>(&self, clause: &'static str, params: P) -> DomainResult<Vec<Integration>>
    where
        P: Params + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Vec<Integration>> {
            let conn = db.get_connection()?;
            select_many(&conn, clause, params)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl IntegrationRepository for SqliteIntegrationRepository {
    async fn insert(&self, integration: &Integration) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let row = integration.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let scopes = encode_scopes(&row.scopes)?;
            conn.execute(
                "INSERT INTO integrations (
                    id, workspace_id, provider_type, status, external_account_id,
                    external_account_name, external_org_id, external_org_name, scopes,
                    access_token, refresh_token, token_type, token_expires_at, webhook_secret,
                    created_by, created_at, updated_at, last_sync_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    row.id,
                    row.workspace_id,
                    row.provider_type.as_str(),
                    row.status.as_str(),
                    row.external_account_id,
                    row.external_account_name,
                    row.external_organization_id,
                    row.external_organization_name,
                    scopes,
                    row.access_token,
                    row.refresh_token,
                    row.token_type,
                    opt_to_millis(row.token_expires_at),
                    row.webhook_secret,
                    row.created_by,
                    to_millis(row.created_at),
                    to_millis(row.updated_at),
                    opt_to_millis(row.last_sync_at),
                ],
            )
            .map_err(sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, integration: &Integration) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let row = integration.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let scopes = encode_scopes(&row.scopes)?;
            let changed = conn
                .execute(
                    "UPDATE integrations SET
                        status = ?2, external_account_id = ?3, external_account_name = ?4,
                        external_org_id = ?5, external_org_name = ?6, scopes = ?7,
                        access_token = ?8, refresh_token = ?9, token_type = ?10,
                        token_expires_at = ?11, webhook_secret = ?12, updated_at = ?13,
                        last_sync_at = ?14
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.status.as_str(),
                        row.external_account_id,
                        row.external_account_name,
                        row.external_organization_id,
                        row.external_organization_name,
                        scopes,
                        row.access_token,
                        row.refresh_token,
                        row.token_type,
                        opt_to_millis(row.token_expires_at),
                        row.webhook_secret,
                        to_millis(row.updated_at),
                        opt_to_millis(row.last_sync_at),
                    ],
                )
                .map_err(sql_error)?;

            if changed == 0 {
                return Err(GatewayError::IntegrationNotFound(row.id));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Integration>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Integration>> {
            let conn = db.get_connection()?;
            conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], map_integration_row)
                .optional()
                .map_err(sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> DomainResult<Vec<Integration>> {
        self.query_many(
            "WHERE workspace_id = ?1 ORDER BY updated_at DESC, rowid DESC",
            [workspace_id.to_string()],
        )
        .await
    }

    async fn find_active(
        &self,
        workspace_id: &str,
        provider_type: ProviderType,
        external_organization_id: Option<&str>,
    ) -> DomainResult<Option<Integration>> {
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.to_string();
        let org = external_organization_id.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<Option<Integration>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!(
                    "{SELECT_COLUMNS}
                     WHERE workspace_id = ?1 AND provider_type = ?2 AND status = 'ACTIVE'
                       AND COALESCE(external_org_id, '') = COALESCE(?3, '')
                     ORDER BY updated_at DESC LIMIT 1"
                ),
                params![workspace_id, provider_type.as_str(), org],
                map_integration_row,
            )
            .optional()
            .map_err(sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_external_organization(
        &self,
        provider_type: ProviderType,
        external_organization_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        self.query_many(
            "WHERE provider_type = ?1 AND external_org_id = ?2
             ORDER BY updated_at DESC, rowid DESC",
            [provider_type.as_str().to_string(), external_organization_id.to_string()],
        )
        .await
    }

    async fn find_by_external_account(
        &self,
        provider_type: ProviderType,
        external_account_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        self.query_many(
            "WHERE provider_type = ?1 AND external_account_id = ?2
             ORDER BY updated_at DESC, rowid DESC",
            [provider_type.as_str().to_string(), external_account_id.to_string()],
        )
        .await
    }

    async fn update_status(
        &self,
        id: &str,
        status: IntegrationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE integrations SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, status.as_str(), to_millis(updated_at)],
                )
                .map_err(sql_error)?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn touch_last_sync(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE integrations SET last_sync_at = ?2 WHERE id = ?1",
                params![id, to_millis(at)],
            )
            .map_err(sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed =
                conn.execute("DELETE FROM integrations WHERE id = ?1", params![id]).map_err(sql_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn select_many<P: Params>(conn: &Connection, clause: &str, params: P) -> DomainResult<Vec<Integration>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} {clause}")).map_err(sql_error)?;
    let rows = stmt.query_map(params, map_integration_row).map_err(sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_error)
}

fn encode_scopes(scopes: &BTreeSet<String>) -> DomainResult<String> {
    serde_json::to_string(scopes)
        .map_err(|e| GatewayError::Internal(format!("failed to encode scopes: {e}")))
}

fn map_integration_row(row: &Row<'_>) -> rusqlite::Result<Integration> {
    let provider: String = row.get(2)?;
    let status: String = row.get(3)?;
    let scopes: String = row.get(8)?;
    let scopes: BTreeSet<String> = serde_json::from_str(&scopes).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Integration {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        provider_type: parse_column::<ProviderType>(2, &provider)?,
        status: parse_column::<IntegrationStatus>(3, &status)?,
        external_account_id: row.get(4)?,
        external_account_name: row.get(5)?,
        external_organization_id: row.get(6)?,
        external_organization_name: row.get(7)?,
        scopes,
        access_token: row.get(9)?,
        refresh_token: row.get(10)?,
        token_type: row.get(11)?,
        token_expires_at: opt_from_millis(row.get(12)?)?,
        webhook_secret: row.get(13)?,
        created_by: row.get(14)?,
        created_at: from_millis(row.get(15)?)?,
        updated_at: from_millis(row.get(16)?)?,
        last_sync_at: opt_from_millis(row.get(17)?)?,
    })
}

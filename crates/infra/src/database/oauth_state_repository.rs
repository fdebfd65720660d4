//! SQLite-backed OAuth state store
//!
//! `consume` is a single `UPDATE ... RETURNING` statement, so the
//! check-and-set is atomic across connections and processes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaygate_core::OAuthStateStore;
use relaygate_domain::{OAuthState, ProviderType, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::DbManager;
use super::support::{from_millis, map_join_error, parse_column, sql_error, to_millis};

pub struct SqliteOAuthStateStore {
    db: Arc<DbManager>,
}

impl SqliteOAuthStateStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OAuthStateStore for SqliteOAuthStateStore {
    async fn insert(&self, state: OAuthState) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO oauth_states (
                    state, nonce, workspace_id, user_id, provider_type, redirect_url,
                    created_at, expires_at, consumed
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    state.state,
                    state.nonce,
                    state.workspace_id,
                    state.user_id,
                    state.provider_type.as_str(),
                    state.redirect_url,
                    to_millis(state.created_at),
                    to_millis(state.expires_at),
                    state.consumed,
                ],
            )
            .map_err(sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn consume(&self, state: &str, now: DateTime<Utc>) -> DomainResult<Option<OAuthState>> {
        let db = Arc::clone(&self.db);
        let state = state.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<OAuthState>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "UPDATE oauth_states SET consumed = 1
                 WHERE state = ?1 AND consumed = 0 AND expires_at > ?2
                 RETURNING state, nonce, workspace_id, user_id, provider_type, redirect_url,
                           created_at, expires_at, consumed",
                params![state, to_millis(now)],
                map_state_row,
            )
            .optional()
            .map_err(sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            conn.execute(
                "DELETE FROM oauth_states WHERE consumed = 1 OR expires_at <= ?1",
                params![to_millis(now)],
            )
            .map_err(sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_state_row(row: &Row<'_>) -> rusqlite::Result<OAuthState> {
    let provider: String = row.get(4)?;
    Ok(OAuthState {
        state: row.get(0)?,
        nonce: row.get(1)?,
        workspace_id: row.get(2)?,
        user_id: row.get(3)?,
        provider_type: parse_column::<ProviderType>(4, &provider)?,
        redirect_url: row.get(5)?,
        created_at: from_millis(row.get(6)?)?,
        expires_at: from_millis(row.get(7)?)?,
        consumed: row.get(8)?,
    })
}

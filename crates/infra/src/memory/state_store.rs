use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relaygate_core::OAuthStateStore;
use relaygate_domain::{OAuthState, Result as DomainResult};

/// `DashMap`-backed state store. `consume` holds the shard write lock for the
/// whole check-and-set.
#[derive(Debug, Default)]
pub struct InMemoryOAuthStateStore {
    states: DashMap<String, OAuthState>,
}

impl InMemoryOAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl OAuthStateStore for InMemoryOAuthStateStore {
    async fn insert(&self, state: OAuthState) -> DomainResult<()> {
        self.states.insert(state.state.clone(), state);
        Ok(())
    }

    async fn consume(&self, state: &str, now: DateTime<Utc>) -> DomainResult<Option<OAuthState>> {
        let Some(mut entry) = self.states.get_mut(state) else {
            return Ok(None);
        };
        if !entry.is_redeemable_at(now) {
            return Ok(None);
        }
        entry.consumed = true;
        Ok(Some(entry.value().clone()))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let before = self.states.len();
        self.states.retain(|_, state| state.is_redeemable_at(now));
        Ok(before.saturating_sub(self.states.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use relaygate_domain::ProviderType;

    use super::*;

    fn state(id: &str, now: DateTime<Utc>) -> OAuthState {
        OAuthState {
            state: id.into(),
            nonce: "n".into(),
            workspace_id: "W1".into(),
            user_id: "U1".into(),
            provider_type: ProviderType::Slack,
            redirect_url: None,
            created_at: now,
            expires_at: now + Duration::minutes(10),
            consumed: false,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consume_has_single_winner() {
        let store = Arc::new(InMemoryOAuthStateStore::new());
        let now = Utc::now();
        store.insert(state("s", now)).await.expect("insert");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.consume("s", now).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("join").expect("consume").is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn purge_keeps_only_redeemable_states() {
        let store = InMemoryOAuthStateStore::new();
        let now = Utc::now();
        store.insert(state("fresh", now)).await.expect("insert");
        store.insert(state("stale", now - Duration::minutes(30))).await.expect("insert");

        assert_eq!(store.purge_expired(now).await.expect("purge"), 1);
        assert_eq!(store.len(), 1);
    }
}

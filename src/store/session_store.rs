use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::session::ChatSession;

/// Persistent chat sessions (spec.md §1). Last-writer-wins per turn is safe because
/// the orchestrator serializes turns per session id before ever calling `save`
/// (spec.md §5).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<ChatSession>>;
    async fn save(&self, session: &ChatSession) -> anyhow::Result<()>;

    /// `None` means the session either never existed or has expired per `ttl`.
    async fn load_if_fresh(&self, id: Uuid, ttl: chrono::Duration) -> anyhow::Result<Option<ChatSession>> {
        let Some(session) = self.load(id).await? else {
            return Ok(None);
        };
        if chrono::Utc::now() - session.updated_at > ttl {
            return Ok(None);
        }
        Ok(Some(session))
    }
}

/// Grounded on the teacher's `ChatDatabaseService` persistence pattern: one row per
/// conversation, the mutable aggregate stored as JSON (spec.md §6 "Persisted layout").
pub struct PgSessionStore {
    pool: sqlx::PgPool,
}

impl PgSessionStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<ChatSession>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM chat_session WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(payload,)| Ok(serde_json::from_value(payload)?)).transpose()
    }

    async fn save(&self, session: &ChatSession) -> anyhow::Result<()> {
        let payload = serde_json::to_value(session)?;
        sqlx::query(
            "INSERT INTO chat_session (id, payload, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at",
        )
        .bind(session.id)
        .bind(payload)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory store for tests and local dev without Postgres.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: dashmap::DashMap<Uuid, ChatSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<ChatSession>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn save(&self, session: &ChatSession) -> anyhow::Result<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = MemorySessionStore::new();
        let session = ChatSession::new(Uuid::new_v4(), Utc::now());
        store.save(&session).await.unwrap();
        let loaded = store.load(session.id).await.unwrap().expect("present");
        assert_eq!(loaded.id, session.id);
    }

    #[tokio::test]
    async fn expired_session_not_returned() {
        let store = MemorySessionStore::new();
        let mut session = ChatSession::new(Uuid::new_v4(), Utc::now() - chrono::Duration::hours(48));
        session.updated_at = Utc::now() - chrono::Duration::hours(48);
        store.save(&session).await.unwrap();
        let loaded = store.load_if_fresh(session.id, chrono::Duration::hours(24)).await.unwrap();
        assert!(loaded.is_none());
    }
}

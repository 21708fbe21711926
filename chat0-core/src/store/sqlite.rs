//! SQLite implementation of [`ChatStore`]

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;
use tracing::debug;

use chat0_models::providers::{Content, Role};

use super::migrations::Migrator;
use super::{ChatMessage, ChatStore, MessageSummary, StoreError, Thread};

/// SQLite-backed chat history
pub struct SqliteChatStore {
    conn: Mutex<Connection>,
}

impl SqliteChatStore {
    /// Open or create database at path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Migrator::new(&conn).migrate()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn role_to_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn role_from_str(s: &str) -> Result<Role, StoreError> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(StoreError::Corrupt(format!("unknown role {other}"))),
        }
    }

    fn parse_time(s: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s}: {e}")))
    }

    fn touch_thread(conn: &Connection, thread_id: &str, now: &str) -> Result<(), StoreError> {
        let updated = conn.execute(
            "UPDATE threads SET updated_at = ?1 WHERE id = ?2",
            params![now, thread_id],
        )?;
        if updated == 0 {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_thread(&self, id: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO threads (id, title, created_at, updated_at) VALUES (?1, NULL, ?2, ?2)",
            params![id, now],
        )?;
        debug!(thread_id = id, "created thread");
        Ok(())
    }

    async fn create_message(&self, thread_id: &str, message: &ChatMessage) -> Result<(), StoreError> {
        let content = serde_json::to_string(&message.content)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let created_at = message.created_at.to_rfc3339();

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        Self::touch_thread(&tx, thread_id, &created_at)?;
        tx.execute(
            "INSERT INTO messages (id, thread_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                thread_id,
                Self::role_to_str(message.role),
                content,
                created_at
            ],
        )?;
        tx.commit()?;
        debug!(thread_id, message_id = %message.id, "stored message");
        Ok(())
    }

    async fn update_thread(&self, thread_id: &str, title: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE threads SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now, thread_id],
        )?;
        if updated == 0 {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    async fn create_message_summary(
        &self,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO message_summaries (thread_id, message_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![thread_id, message_id, content, now],
        )?;
        Ok(())
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, title, created_at, updated_at FROM threads WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, title, created_at, updated_at)| {
            Ok(Thread {
                id,
                title,
                created_at: Self::parse_time(&created_at)?,
                updated_at: Self::parse_time(&updated_at)?,
            })
        })
        .transpose()
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, created_at FROM messages WHERE thread_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![thread_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, role, content, created_at)| {
                let content: Content = serde_json::from_str(&content)
                    .map_err(|e| StoreError::Corrupt(format!("message {id}: {e}")))?;
                Ok(ChatMessage {
                    role: Self::role_from_str(&role)?,
                    content,
                    created_at: Self::parse_time(&created_at)?,
                    id,
                })
            })
            .collect()
    }

    async fn list_message_summaries(&self, thread_id: &str) -> Result<Vec<MessageSummary>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT thread_id, message_id, content, created_at FROM message_summaries WHERE thread_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![thread_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(thread_id, message_id, content, created_at)| {
                Ok(MessageSummary {
                    thread_id,
                    message_id,
                    content,
                    created_at: Self::parse_time(&created_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chat0_models::providers::ContentPart;

    use super::*;

    #[tokio::test]
    async fn test_thread_lifecycle() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        assert!(store.get_thread("t1").await.unwrap().is_none());

        store.create_thread("t1").await.unwrap();
        let thread = store.get_thread("t1").await.unwrap().unwrap();
        assert!(thread.title.is_none());

        store.update_thread("t1", "Kyoto trip").await.unwrap();
        let thread = store.get_thread("t1").await.unwrap().unwrap();
        assert_eq!(thread.title.as_deref(), Some("Kyoto trip"));
    }

    #[tokio::test]
    async fn test_duplicate_thread_is_rejected() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        store.create_thread("t1").await.unwrap();
        assert!(matches!(
            store.create_thread("t1").await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_messages_keep_order_and_content() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        store.create_thread("t1").await.unwrap();

        let user = ChatMessage::new(
            Role::User,
            Content::Parts(vec![
                ContentPart::text("what is this"),
                ContentPart::image("data:image/png;base64,AAAA"),
            ]),
        );
        let assistant = ChatMessage::new(
            Role::Assistant,
            Content::Parts(vec![
                ContentPart::Reasoning {
                    text: "looking".into(),
                },
                ContentPart::text("a square"),
            ]),
        );
        store.create_message("t1", &user).await.unwrap();
        store.create_message("t1", &assistant).await.unwrap();

        let messages = store.list_messages("t1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, user.id);
        assert_eq!(messages[0].content, user.content);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, assistant.content);
    }

    #[tokio::test]
    async fn test_message_for_missing_thread_fails() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let message = ChatMessage::new(Role::User, "hi");
        assert!(matches!(
            store.create_message("nope", &message).await,
            Err(StoreError::ThreadNotFound(_))
        ));
        assert!(matches!(
            store.update_thread("nope", "title").await,
            Err(StoreError::ThreadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_message_summaries() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        store.create_thread("t1").await.unwrap();
        store
            .create_message_summary("t1", "m1", "Plan my trip")
            .await
            .unwrap();

        let summaries = store.list_message_summaries("t1").await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_id, "m1");
        assert_eq!(summaries[0].content, "Plan my trip");
        assert!(store.list_message_summaries("t2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat0.db");

        {
            let store = SqliteChatStore::open(&path).unwrap();
            store.create_thread("t1").await.unwrap();
            store
                .create_message("t1", &ChatMessage::new(Role::User, "hello"))
                .await
                .unwrap();
        }

        let store = SqliteChatStore::open(&path).unwrap();
        let messages = store.list_messages("t1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.as_text(), "hello");
    }
}

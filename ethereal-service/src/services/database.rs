//! SQLite record store for the ethereal layer.
//!
//! The store is the single synchronization point: membership counts, session
//! rows, lock fields and rate-limit counters all live here, and the atomic
//! multi-step operations (join, lock acquire, save-with-revision) run as
//! transactions against it. Nothing outside this layer may touch the tables.

use chrono::{DateTime, Utc};
use ethereal_core::error::AppError;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::models::{
    Document, DocumentRevision, LockState, Member, Message, MessageView, RateLimitRecord, Room,
    Session,
};

/// Outcome of an insert that races against a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict,
}

/// Outcome of a document save attempt.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(Document),
    /// Another member holds a live lease; nothing was written.
    Locked {
        holder: Uuid,
        expires_utc: DateTime<Utc>,
    },
    Missing,
}

/// SQLite database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!(e))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== Room Operations ====================

    /// Find a room by the hash of its shared secret.
    pub async fn find_room_by_secret_hash(&self, hash: &str) -> Result<Option<Room>, AppError> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE secret_hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Insert a room; a concurrent creator winning the race is an expected,
    /// handled outcome, not an error path.
    pub async fn try_insert_room(&self, room: &Room) -> Result<InsertOutcome, AppError> {
        let result = sqlx::query(
            "INSERT INTO rooms (room_id, secret_hash, created_utc) VALUES (?, ?, ?)",
        )
        .bind(room.room_id)
        .bind(&room.secret_hash)
        .bind(room.created_utc)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Conflict),
            Err(e) => Err(db_err(e)),
        }
    }

    // ==================== Member Operations ====================

    pub async fn find_member(&self, member_id: Uuid) -> Result<Option<Member>, AppError> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE member_id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn list_members(&self, room_id: Uuid) -> Result<Vec<Member>, AppError> {
        sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE room_id = ? ORDER BY created_utc ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn count_members(&self, room_id: Uuid) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Refresh a member's last-seen timestamp. Best-effort; callers ignore
    /// the result for correctness purposes.
    pub async fn touch_member_last_seen(&self, member_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE members SET last_seen_utc = ? WHERE member_id = ?")
            .bind(Utc::now())
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Remove a membership and everything keyed to it: sessions and messages
    /// go in the same transaction so the member row's foreign keys never
    /// dangle. Documents stay; their author id is attribution, not a key.
    pub async fn delete_member(&self, member_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM sessions WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM messages WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM members WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    pub async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, room_id, member_id, expires_utc, created_utc)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.session_id)
        .bind(session.room_id)
        .bind(session.member_id)
        .bind(session.expires_utc)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Revoke every session a member holds (kick).
    pub async fn delete_sessions_for_member(&self, member_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE member_id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    // ==================== Message Operations ====================

    pub async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO messages (message_id, room_id, member_id, content, created_utc)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.message_id)
        .bind(message.room_id)
        .bind(message.member_id)
        .bind(&message.content)
        .bind(message.created_utc)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn list_messages(
        &self,
        room_id: Uuid,
        limit: i64,
    ) -> Result<Vec<MessageView>, AppError> {
        sqlx::query_as::<_, MessageView>(
            r#"
            SELECT m.message_id, m.member_id, mb.display_name, m.content, m.created_utc
            FROM messages m
            JOIN members mb ON mb.member_id = m.member_id
            WHERE m.room_id = ?
            ORDER BY m.created_utc DESC
            LIMIT ?
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    // ==================== Document Operations ====================

    pub async fn insert_document(&self, doc: &Document) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                document_id, room_id, author_id, content, tags, pinned, media,
                lock_holder, lock_expires_utc, updated_by, created_utc, updated_utc
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc.document_id)
        .bind(doc.room_id)
        .bind(doc.author_id)
        .bind(&doc.content)
        .bind(&doc.tags)
        .bind(doc.pinned)
        .bind(&doc.media)
        .bind(doc.lock_holder)
        .bind(doc.lock_expires_utc)
        .bind(doc.updated_by)
        .bind(doc.created_utc)
        .bind(doc.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_document(
        &self,
        room_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE document_id = ? AND room_id = ?",
        )
        .bind(document_id)
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_documents(&self, room_id: Uuid) -> Result<Vec<Document>, AppError> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE room_id = ? ORDER BY pinned DESC, updated_utc DESC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Save a document update atomically: snapshot the previous content into
    /// the append-only revision log when it changed, apply the update, and
    /// clear the lock fields in the same statement (release-on-write). A live
    /// lease held by someone else refuses the whole save; the lock check runs
    /// inside the transaction so a concurrent acquirer cannot slip in between
    /// the check and the write. The media column is untouched; attachments
    /// have their own path.
    pub async fn save_document(
        &self,
        room_id: Uuid,
        document_id: Uuid,
        content: String,
        tags_json: String,
        pinned: bool,
        editor: Uuid,
    ) -> Result<SaveOutcome, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // First statement is a write so the transaction takes SQLite's write
        // lock up front; a deferred upgrade after the read below could fail
        // on a stale snapshot when another writer commits in between.
        let touched = sqlx::query(
            "UPDATE documents SET updated_by = updated_by WHERE document_id = ? AND room_id = ?",
        )
        .bind(document_id)
        .bind(room_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if touched.rows_affected() == 0 {
            return Ok(SaveOutcome::Missing);
        }

        let current = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE document_id = ? AND room_id = ?",
        )
        .bind(document_id)
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        if let LockState::LockedFresh {
            holder,
            expires_utc,
        } = current.lock_state(now)
        {
            if holder != editor {
                return Ok(SaveOutcome::Locked {
                    holder,
                    expires_utc,
                });
            }
        }

        if current.content != content {
            sqlx::query(
                r#"
                INSERT INTO document_revisions (
                    revision_id, document_id, content, tags, edited_by, created_utc
                )
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(&current.content)
            .bind(&current.tags)
            .bind(current.updated_by.or(Some(current.author_id)))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        sqlx::query(
            r#"
            UPDATE documents
            SET content = ?, tags = ?, pinned = ?,
                lock_holder = NULL, lock_expires_utc = NULL,
                updated_by = ?, updated_utc = ?
            WHERE document_id = ? AND room_id = ?
            "#,
        )
        .bind(&content)
        .bind(&tags_json)
        .bind(pinned)
        .bind(editor)
        .bind(now)
        .bind(document_id)
        .bind(room_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        match self.find_document(room_id, document_id).await? {
            Some(doc) => Ok(SaveOutcome::Saved(doc)),
            None => Ok(SaveOutcome::Missing),
        }
    }

    /// Replace the attached-media list. Media changes are not content
    /// changes: no revision snapshot, and the lock fields stay as they are.
    pub async fn set_document_media(
        &self,
        room_id: Uuid,
        document_id: Uuid,
        media_json: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE documents SET media = ?, updated_utc = ? WHERE document_id = ? AND room_id = ?",
        )
        .bind(media_json)
        .bind(Utc::now())
        .bind(document_id)
        .bind(room_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a document and its revision log in one transaction. Revisions
    /// reference the document row, so they go first.
    pub async fn delete_document(
        &self,
        room_id: Uuid,
        document_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            DELETE FROM document_revisions
            WHERE document_id IN (
                SELECT document_id FROM documents WHERE document_id = ? AND room_id = ?
            )
            "#,
        )
        .bind(document_id)
        .bind(room_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let result = sqlx::query("DELETE FROM documents WHERE document_id = ? AND room_id = ?")
            .bind(document_id)
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_revisions(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<DocumentRevision>, AppError> {
        sqlx::query_as::<_, DocumentRevision>(
            "SELECT * FROM document_revisions WHERE document_id = ? ORDER BY created_utc DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    // ==================== Rate Limit Operations ====================

    pub async fn find_rate_limit(
        &self,
        identifier: &str,
        endpoint: &str,
    ) -> Result<Option<RateLimitRecord>, AppError> {
        sqlx::query_as::<_, RateLimitRecord>(
            "SELECT * FROM rate_limits WHERE identifier = ? AND endpoint = ?",
        )
        .bind(identifier)
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn upsert_rate_limit(&self, record: &RateLimitRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (identifier, endpoint, fail_count, last_attempt_utc, blocked_until_utc)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (identifier, endpoint) DO UPDATE SET
                fail_count = excluded.fail_count,
                last_attempt_utc = excluded.last_attempt_utc,
                blocked_until_utc = excluded.blocked_until_utc
            "#,
        )
        .bind(&record.identifier)
        .bind(&record.endpoint)
        .bind(record.fail_count)
        .bind(record.last_attempt_utc)
        .bind(record.blocked_until_utc)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete_rate_limit(&self, identifier: &str, endpoint: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM rate_limits WHERE identifier = ? AND endpoint = ?")
            .bind(identifier)
            .bind(endpoint)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

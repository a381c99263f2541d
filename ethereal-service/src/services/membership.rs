//! Membership manager: capacity-bounded atomic room join.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{RoomConfig, TokenConfig};
use crate::models::Member;
use crate::services::database::Database;
use crate::services::error::GateError;
use crate::services::rooms::{hash_secret, RoomDirectory};
use crate::services::sessions::SessionStore;
use crate::services::token::TokenService;

/// Everything a device needs after a successful join.
#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub session_id: Uuid,
    pub token: String,
    pub expires_utc: DateTime<Utc>,
    pub is_owner: bool,
    pub is_new_room: bool,
    pub member_count: i64,
}

#[derive(Clone)]
pub struct MembershipManager {
    db: Database,
    directory: RoomDirectory,
    sessions: SessionStore,
    tokens: TokenService,
    capacity: i64,
    secret_min_length: usize,
    session_ttl_days: i64,
}

impl MembershipManager {
    pub fn new(
        db: Database,
        directory: RoomDirectory,
        sessions: SessionStore,
        tokens: TokenService,
        room: &RoomConfig,
        token: &TokenConfig,
    ) -> Self {
        Self {
            db,
            directory,
            sessions,
            tokens,
            capacity: room.capacity,
            secret_min_length: room.secret_min_length,
            session_ttl_days: token.session_ttl_days,
        }
    }

    /// Join a room by shared secret.
    ///
    /// Resolves or creates the room, then runs the count/insert step in one
    /// transaction so two concurrent joiners cannot both squeeze past the
    /// capacity ceiling. A device that is already a member re-joins
    /// idempotently regardless of the count.
    pub async fn join(
        &self,
        secret: &str,
        device_id: &str,
        display_name: &str,
    ) -> Result<JoinResult, GateError> {
        if secret.is_empty() || device_id.is_empty() || display_name.is_empty() {
            return Err(GateError::MissingFields(
                "secret, deviceId, displayName".to_string(),
            ));
        }
        if secret.len() < self.secret_min_length {
            return Err(GateError::PinTooShort);
        }

        let secret_hash = hash_secret(secret);
        let (room_id, is_new_room) = self.directory.get_or_create(&secret_hash).await?;

        let (member, member_count, is_rejoin) = self
            .join_membership(room_id, device_id, display_name)
            .await?;

        // Session + token mint happen after the membership commit. If they
        // fail, a brand-new membership row is rolled back by hand so the
        // room is not left holding a seat nobody can use.
        let issued = async {
            let session = self
                .sessions
                .create(room_id, member.member_id, self.session_ttl_days)
                .await?;
            let issued = self.tokens.issue_room_token(
                room_id,
                member.member_id,
                session.session_id,
                Duration::days(self.session_ttl_days),
            )?;
            Ok::<_, anyhow::Error>((session, issued))
        }
        .await;

        let (session, issued) = match issued {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "session creation failed after join");
                if !is_rejoin {
                    let _ = self.db.delete_member(member.member_id).await;
                }
                return Err(GateError::JoinError);
            }
        };

        tracing::info!(
            room_id = %room_id,
            member_id = %member.member_id,
            is_new_room,
            is_rejoin,
            member_count,
            "device joined room"
        );

        Ok(JoinResult {
            room_id,
            member_id: member.member_id,
            session_id: session.session_id,
            token: issued.token,
            expires_utc: issued.expires_utc,
            is_owner: member.is_owner,
            is_new_room,
            member_count,
        })
    }

    /// The atomic count-then-insert step. Returns the membership row, the
    /// member count after the step, and whether this was a re-join.
    async fn join_membership(
        &self,
        room_id: Uuid,
        device_id: &str,
        display_name: &str,
    ) -> Result<(Member, i64, bool), GateError> {
        let mut tx = self.db.pool().begin().await?;

        // First statement is a write so the transaction takes SQLite's write
        // lock before the count below; two concurrent joiners then serialize
        // here instead of failing on a stale snapshot at insert time.
        sqlx::query("UPDATE rooms SET created_utc = created_utc WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE room_id = ? AND device_id = ?",
        )
        .bind(room_id)
        .bind(device_id)
        .fetch_optional(&mut *tx)
        .await?;

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(mut member) = existing {
            sqlx::query(
                "UPDATE members SET display_name = ?, last_seen_utc = ? WHERE member_id = ?",
            )
            .bind(display_name)
            .bind(Utc::now())
            .bind(member.member_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            member.display_name = display_name.to_string();
            return Ok((member, count, true));
        }

        if count >= self.capacity {
            return Err(GateError::RoomFull);
        }

        let member = Member::new(
            room_id,
            device_id.to_string(),
            display_name.to_string(),
            count == 0,
        );
        sqlx::query(
            r#"
            INSERT INTO members (
                member_id, room_id, device_id, display_name, is_owner,
                last_seen_utc, created_utc
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(member.member_id)
        .bind(member.room_id)
        .bind(&member.device_id)
        .bind(&member.display_name)
        .bind(member.is_owner)
        .bind(member.last_seen_utc)
        .bind(member.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A concurrent join of the same device trips UNIQUE(room_id,
            // device_id); the caller may retry, never this layer.
            tracing::warn!(error = %e, "member insert failed");
            GateError::JoinError
        })?;

        tx.commit().await?;
        Ok((member, count + 1, false))
    }
}

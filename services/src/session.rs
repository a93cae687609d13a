//! Session lifecycle and credential resolution.

use chrono::{Duration, Utc};
use db::models::class_session::{self, Status};
use db::models::user::{self, Role};
use rand::Rng;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;

use crate::token::TokenCodec;

pub use db::models::class_session::Model as ClassSession;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Only the owning teacher or an admin may manage this session")]
    Forbidden,
    #[error("Illegal status transition")]
    IllegalTransition,
    /// Covers unknown codes, expired or forged tokens, superseded tokens
    /// and sessions that are no longer active. One message for all of them
    /// so a prober cannot distinguish the cases.
    #[error("Invalid or closed session code")]
    InvalidCredential,
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub struct SessionService;

impl SessionService {
    /// Creates an ACTIVE session with a fresh 6-digit code and a signed
    /// token bound to the new session id.
    ///
    /// The token carries the session id, so it can only be issued after the
    /// insert assigns one; the row briefly holds an empty token that nothing
    /// can ever match.
    pub async fn create(
        db: &DatabaseConnection,
        codec: &TokenCodec,
        teacher_id: i64,
        course_id: i64,
        batch_id: i64,
        duration_minutes: i64,
    ) -> Result<ClassSession, SessionError> {
        let code = Self::mint_unused_code(db).await?;
        let now = Utc::now();
        let end_time = now + Duration::minutes(duration_minutes);

        let session = class_session::Model::create(
            db, teacher_id, course_id, batch_id, &code, "", now, end_time,
        )
        .await?;

        let token = codec.issue(session.id);
        let session = session.update_token(db, &token).await?;

        tracing::info!(
            session_id = session.id,
            teacher_id,
            code = %session.session_code,
            "attendance session opened"
        );
        Ok(session)
    }

    /// Draws 6-digit codes until one is not held by a currently active
    /// session. Collisions are rare enough that this loops at most a few
    /// times in practice.
    async fn mint_unused_code(db: &DatabaseConnection) -> Result<String, DbErr> {
        loop {
            let code = rand::thread_rng().gen_range(100_000..=999_999).to_string();
            if class_session::Model::find_active_by_code(db, &code)
                .await?
                .is_none()
            {
                return Ok(code);
            }
        }
    }

    /// Moves a session to a new lifecycle state.
    ///
    /// ACTIVE and CLOSED convert freely in both directions; either may be
    /// ARCHIVED; ARCHIVED is terminal. Setting the current status again is
    /// a no-op rather than an error, so retried requests stay harmless.
    pub async fn set_status(
        db: &DatabaseConnection,
        session_id: i64,
        actor_id: i64,
        new_status: Status,
    ) -> Result<ClassSession, SessionError> {
        let session = Self::load_owned(db, session_id, actor_id).await?;

        if session.status == new_status {
            return Ok(session);
        }
        if session.status == Status::Archived {
            return Err(SessionError::IllegalTransition);
        }

        let session = session.update_status(db, new_status).await?;
        tracing::info!(session_id, status = %session.status, "session status changed");
        Ok(session)
    }

    /// Replaces the session's token with a freshly issued one. Previously
    /// issued tokens stop resolving immediately, even while unexpired.
    pub async fn rotate_token(
        db: &DatabaseConnection,
        codec: &TokenCodec,
        session_id: i64,
        actor_id: i64,
    ) -> Result<ClassSession, SessionError> {
        let session = Self::load_owned(db, session_id, actor_id).await?;
        if session.status == Status::Archived {
            return Err(SessionError::IllegalTransition);
        }

        let token = codec.issue(session.id);
        let session = session.update_token(db, &token).await?;
        tracing::debug!(session_id, "session token rotated");
        Ok(session)
    }

    /// Resolves a scanned token or typed code to the ACTIVE session it
    /// names.
    ///
    /// Six digits means the numeric fallback path; anything else is treated
    /// as a codec payload and verified before the database is touched. A
    /// token that verifies but no longer equals the session's current one
    /// has been rotated away and is refused.
    pub async fn resolve_active(
        db: &DatabaseConnection,
        codec: &TokenCodec,
        credential: &str,
    ) -> Result<ClassSession, SessionError> {
        if credential.len() == 6 && credential.bytes().all(|b| b.is_ascii_digit()) {
            return class_session::Model::find_active_by_code(db, credential)
                .await?
                .ok_or(SessionError::InvalidCredential);
        }

        let session_id = codec
            .verify(credential)
            .map_err(|_| SessionError::InvalidCredential)?;
        let session = class_session::Model::find_by_id(db, session_id)
            .await?
            .ok_or(SessionError::InvalidCredential)?;
        if !session.is_active() || session.current_token != credential {
            return Err(SessionError::InvalidCredential);
        }
        Ok(session)
    }

    async fn load_owned(
        db: &DatabaseConnection,
        session_id: i64,
        actor_id: i64,
    ) -> Result<ClassSession, SessionError> {
        let session = class_session::Model::find_by_id(db, session_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        if session.teacher_id != actor_id
            && !user::Model::has_role(db, actor_id, Role::Admin).await?
        {
            return Err(SessionError::Forbidden);
        }
        Ok(session)
    }
}

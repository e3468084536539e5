//! Session repository: sessions, their hops, and aggregate statistics.
//!
//! A session row carries denormalized totals and score for listing; the
//! full hop chain lives in `hops`. Stored hops are never rewritten: saving
//! a session again only adds hops with new sequence numbers.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use ucp_core::{ProviderConfigId, SessionId};
use ucp_ledger::{Hop, Session, SessionStatus};
use ucp_tokens::SessionTotals;

use crate::errors::{Result, StoreError};
use crate::sqlite::{from_db_int, parse_column, to_db_int};

/// Listing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionOrder {
    /// Newest first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
    /// Highest score first; unscored sessions last.
    Score,
    /// Most tokens first.
    Tokens,
}

/// Listing filter.
#[derive(Clone, Debug, Default)]
pub struct SessionFilter {
    /// Only sessions in this state.
    pub status: Option<SessionStatus>,
    /// Only sessions run against this provider configuration.
    pub provider_config_id: Option<ProviderConfigId>,
    /// Only replays of this session.
    pub replay_of: Option<SessionId>,
    /// Ordering.
    pub order: SessionOrder,
    /// Maximum results.
    pub limit: Option<u32>,
    /// Results to skip.
    pub offset: Option<u32>,
}

/// One row of a session listing, without hops.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Identifier.
    pub session_id: SessionId,
    /// Prompt as submitted.
    pub raw_prompt: String,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Provider configuration used.
    pub provider_config_ref: Option<ProviderConfigId>,
    /// Session replayed by this one.
    pub replay_of: Option<SessionId>,
    /// Usage and cost.
    pub totals: SessionTotals,
    /// Mean hop score.
    pub score: Option<f64>,
    /// Recorded hops.
    pub hop_count: u64,
    /// Head of the chain.
    pub chain_hash: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// Aggregates over stored sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Stored sessions.
    pub total: u64,
    /// Sessions that ended in `success`.
    pub successful: u64,
    /// Sessions that ended in `error`.
    pub failed: u64,
    /// Tokens across all sessions.
    pub total_tokens: u64,
    /// Estimated spend across all sessions.
    pub total_cost: f64,
    /// Mean of session scores, over scored sessions.
    pub average_score: Option<f64>,
}

const SESSION_COLUMNS: &str = "id, raw_prompt, provider_config_id, status, chain_hash, replay_of, \
     final_output, failure, prompt_tokens, completion_tokens, total_tokens, cost_estimate, \
     latency_ms, context_window_used, score, hop_count, created_at, updated_at";

struct SessionRow {
    id: String,
    raw_prompt: String,
    provider_config_id: Option<String>,
    status: String,
    chain_hash: String,
    replay_of: Option<String>,
    final_output: Option<String>,
    failure: Option<String>,
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
    cost_estimate: f64,
    latency_ms: i64,
    context_window_used: f64,
    score: Option<f64>,
    hop_count: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn map(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            raw_prompt: row.get(1)?,
            provider_config_id: row.get(2)?,
            status: row.get(3)?,
            chain_hash: row.get(4)?,
            replay_of: row.get(5)?,
            final_output: row.get(6)?,
            failure: row.get(7)?,
            prompt_tokens: row.get(8)?,
            completion_tokens: row.get(9)?,
            total_tokens: row.get(10)?,
            cost_estimate: row.get(11)?,
            latency_ms: row.get(12)?,
            context_window_used: row.get(13)?,
            score: row.get(14)?,
            hop_count: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    fn totals(&self) -> SessionTotals {
        SessionTotals {
            prompt_tokens: from_db_int(self.prompt_tokens),
            completion_tokens: from_db_int(self.completion_tokens),
            total_tokens: from_db_int(self.total_tokens),
            cost_estimate: self.cost_estimate,
            latency_ms: from_db_int(self.latency_ms),
            context_window_used: self.context_window_used,
        }
    }

    fn into_summary(self) -> Result<SessionSummary> {
        Ok(SessionSummary {
            totals: self.totals(),
            session_id: SessionId::from(self.id),
            raw_prompt: self.raw_prompt,
            status: parse_column(&self.status)?,
            provider_config_ref: self.provider_config_id.map(ProviderConfigId::from),
            replay_of: self.replay_of.map(SessionId::from),
            score: self.score,
            hop_count: from_db_int(self.hop_count),
            chain_hash: self.chain_hash,
            created_at: self.created_at,
        })
    }

    fn into_session(self, hops: Vec<Hop>) -> Result<Session> {
        Ok(Session {
            totals: self.totals(),
            session_id: SessionId::from(self.id),
            raw_prompt: self.raw_prompt,
            provider_config_ref: self.provider_config_id.map(ProviderConfigId::from),
            status: parse_column(&self.status)?,
            hops,
            chain_hash: self.chain_hash,
            replay_of: self.replay_of.map(SessionId::from),
            final_output: self.final_output,
            failure: self.failure,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct HopRow {
    sequence_number: i64,
    hop_type: String,
    payload: String,
    payload_digest: String,
    token_count: i64,
    token_method: String,
    latency_ms: i64,
    prev_hash: String,
    hash: String,
    score: u8,
    timestamp: String,
}

impl HopRow {
    fn map(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sequence_number: row.get(0)?,
            hop_type: row.get(1)?,
            payload: row.get(2)?,
            payload_digest: row.get(3)?,
            token_count: row.get(4)?,
            token_method: row.get(5)?,
            latency_ms: row.get(6)?,
            prev_hash: row.get(7)?,
            hash: row.get(8)?,
            score: row.get(9)?,
            timestamp: row.get(10)?,
        })
    }

    fn into_hop(self) -> Result<Hop> {
        Ok(Hop {
            sequence_number: from_db_int(self.sequence_number),
            hop_type: parse_column(&self.hop_type)?,
            payload: serde_json::from_str(&self.payload)?,
            payload_digest: self.payload_digest,
            token_count: from_db_int(self.token_count),
            token_method: parse_column(&self.token_method)?,
            latency_ms: from_db_int(self.latency_ms),
            prev_hash: self.prev_hash,
            hash: self.hash,
            score: self.score,
            timestamp: self.timestamp,
        })
    }
}

/// Session repository; every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert or update a session and add any hops not yet stored.
    pub fn save(conn: &Connection, session: &Session) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        let totals = &session.totals;
        let _ = tx.execute(
            &format!(
                "INSERT INTO sessions ({SESSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   chain_hash = excluded.chain_hash,
                   final_output = excluded.final_output,
                   failure = excluded.failure,
                   prompt_tokens = excluded.prompt_tokens,
                   completion_tokens = excluded.completion_tokens,
                   total_tokens = excluded.total_tokens,
                   cost_estimate = excluded.cost_estimate,
                   latency_ms = excluded.latency_ms,
                   context_window_used = excluded.context_window_used,
                   score = excluded.score,
                   hop_count = excluded.hop_count,
                   updated_at = excluded.updated_at"
            ),
            params![
                session.session_id.as_str(),
                session.raw_prompt,
                session.provider_config_ref.as_ref().map(ProviderConfigId::as_str),
                session.status.as_str(),
                session.chain_hash,
                session.replay_of.as_ref().map(SessionId::as_str),
                session.final_output,
                session.failure,
                to_db_int(totals.prompt_tokens),
                to_db_int(totals.completion_tokens),
                to_db_int(totals.total_tokens),
                totals.cost_estimate,
                to_db_int(totals.latency_ms),
                totals.context_window_used,
                session.score(),
                to_db_int(session.hops.len() as u64),
                session.created_at,
                session.updated_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO hops (session_id, sequence_number, hop_type, payload, payload_digest,
                   token_count, token_method, latency_ms, prev_hash, hash, score, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(session_id, sequence_number) DO NOTHING",
            )?;
            for hop in &session.hops {
                let _ = stmt.execute(params![
                    session.session_id.as_str(),
                    to_db_int(hop.sequence_number),
                    hop.hop_type.as_str(),
                    hop.payload.to_string(),
                    hop.payload_digest,
                    to_db_int(hop.token_count),
                    hop.token_method.as_str(),
                    to_db_int(hop.latency_ms),
                    hop.prev_hash,
                    hop.hash,
                    hop.score,
                    hop.timestamp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Session by ID, with its hops.
    pub fn get(conn: &Connection, id: &SessionId) -> Result<Option<Session>> {
        let row = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id.as_str()],
                SessionRow::map,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let hops = Self::hops(conn, id)?;
        row.into_session(hops).map(Some)
    }

    /// Session by ID, or [`StoreError::NotFound`].
    pub fn require(conn: &Connection, id: &SessionId) -> Result<Session> {
        Self::get(conn, id)?.ok_or_else(|| StoreError::not_found("session", id.as_str()))
    }

    /// Stored hops of a session, in sequence order.
    pub fn hops(conn: &Connection, id: &SessionId) -> Result<Vec<Hop>> {
        let mut stmt = conn.prepare(
            "SELECT sequence_number, hop_type, payload, payload_digest, token_count, token_method,
                    latency_ms, prev_hash, hash, score, timestamp
             FROM hops WHERE session_id = ?1 ORDER BY sequence_number ASC",
        )?;
        let rows = stmt
            .query_map(params![id.as_str()], HopRow::map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(HopRow::into_hop).collect()
    }

    /// Sessions matching `filter`, without hops.
    pub fn list(conn: &Connection, filter: &SessionFilter) -> Result<Vec<SessionSummary>> {
        use std::fmt::Write;
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            let _ = write!(sql, " AND status = ?{}", values.len() + 1);
            values.push(Box::new(status.as_str()));
        }
        if let Some(provider) = &filter.provider_config_id {
            let _ = write!(sql, " AND provider_config_id = ?{}", values.len() + 1);
            values.push(Box::new(provider.to_string()));
        }
        if let Some(original) = &filter.replay_of {
            let _ = write!(sql, " AND replay_of = ?{}", values.len() + 1);
            values.push(Box::new(original.to_string()));
        }
        sql.push_str(match filter.order {
            SessionOrder::Newest => " ORDER BY created_at DESC, id DESC",
            SessionOrder::Oldest => " ORDER BY created_at ASC, id ASC",
            SessionOrder::Score => " ORDER BY score IS NULL, score DESC, created_at DESC",
            SessionOrder::Tokens => " ORDER BY total_tokens DESC, created_at DESC",
        });
        if let Some(limit) = filter.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = filter.offset {
            if filter.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(refs.as_slice(), SessionRow::map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(SessionRow::into_summary).collect()
    }

    /// Delete a session and its hops. Returns whether it existed.
    pub fn delete(conn: &Connection, id: &SessionId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// Totals across every stored session.
    pub fn stats(conn: &Connection) -> Result<SessionStats> {
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'success'), 0),
                    COALESCE(SUM(status = 'error'), 0),
                    COALESCE(SUM(total_tokens), 0),
                    COALESCE(SUM(cost_estimate), 0.0),
                    AVG(score)
             FROM sessions",
            [],
            |row| {
                Ok(SessionStats {
                    total: from_db_int(row.get(0)?),
                    successful: from_db_int(row.get(1)?),
                    failed: from_db_int(row.get(2)?),
                    total_tokens: from_db_int(row.get(3)?),
                    total_cost: row.get(4)?,
                    average_score: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

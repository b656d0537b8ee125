//! Local cache of provider voices cloned by accounts.
//!
//! The provider owns the voice; this table only remembers which account
//! created it so ownership can be checked before use or deletion.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

use super::{Database, StoreResult, from_millis, to_millis};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredVoice {
    pub voice_id: String,
    pub account_id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub trait VoiceStore: Send + Sync {
    /// Insert or refresh a cached voice.
    fn save(&self, voice: &StoredVoice) -> StoreResult<()>;

    fn list_for_account(&self, account_id: &str) -> StoreResult<Vec<StoredVoice>>;

    fn find_owned(&self, account_id: &str, voice_id: &str) -> StoreResult<Option<StoredVoice>>;

    fn delete(&self, account_id: &str, voice_id: &str) -> StoreResult<bool>;
}

fn voice_from_row(row: &Row<'_>) -> rusqlite::Result<StoredVoice> {
    Ok(StoredVoice {
        voice_id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        created_at: from_millis(row.get(5)?),
    })
}

pub struct SqliteVoiceStore {
    db: Database,
}

impl SqliteVoiceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl VoiceStore for SqliteVoiceStore {
    fn save(&self, voice: &StoredVoice) -> StoreResult<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO voices (voice_id, account_id, name, category, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(voice_id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                description = excluded.description",
            params![
                voice.voice_id,
                voice.account_id,
                voice.name,
                voice.category,
                voice.description,
                to_millis(voice.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_for_account(&self, account_id: &str) -> StoreResult<Vec<StoredVoice>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT voice_id, account_id, name, category, description, created_at
             FROM voices WHERE account_id = ?1 ORDER BY created_at DESC",
        )?;
        let voices = stmt
            .query_map(params![account_id], voice_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(voices)
    }

    fn find_owned(&self, account_id: &str, voice_id: &str) -> StoreResult<Option<StoredVoice>> {
        let conn = self.db.lock();
        let voice = conn
            .query_row(
                "SELECT voice_id, account_id, name, category, description, created_at
                 FROM voices WHERE account_id = ?1 AND voice_id = ?2",
                params![account_id, voice_id],
                voice_from_row,
            )
            .optional()?;
        Ok(voice)
    }

    fn delete(&self, account_id: &str, voice_id: &str) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "DELETE FROM voices WHERE account_id = ?1 AND voice_id = ?2",
            params![account_id, voice_id],
        )?;
        Ok(changed == 1)
    }
}

//! Operation ledger: one immutable row per completed billable operation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use super::{
    Database, StoreError, StoreResult, from_millis, from_sql_int, to_millis, to_sql_int,
};

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Number of days covered by the activity chart, today included
pub const ACTIVITY_WINDOW_DAYS: u64 = 7;

/// Closed set of billable operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "tts")]
    TextSynthesis,
    #[serde(rename = "sts")]
    VoiceConversion,
    #[serde(rename = "voice_cloning")]
    VoiceCloning,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::TextSynthesis,
        OperationKind::VoiceConversion,
        OperationKind::VoiceCloning,
    ];

    /// Stable storage and wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::TextSynthesis => "tts",
            OperationKind::VoiceConversion => "sts",
            OperationKind::VoiceCloning => "voice_cloning",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::TextSynthesis => "Text to Speech",
            OperationKind::VoiceConversion => "Speech to Speech",
            OperationKind::VoiceCloning => "Voice Cloning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific facts about an operation, stored as a JSON column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Leading excerpt of the synthesized text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// A persisted ledger entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRecord {
    pub id: String,
    pub account_id: String,
    pub kind: OperationKind,
    pub cost: u64,
    /// Artifact id of the generated audio
    pub artifact: String,
    pub detail: OperationDetail,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry about to be appended
#[derive(Debug, Clone)]
pub struct NewOperationRecord {
    pub account_id: String,
    pub kind: OperationKind,
    pub cost: u64,
    pub artifact: String,
    pub detail: OperationDetail,
    pub created_at: DateTime<Utc>,
}

impl NewOperationRecord {
    pub fn new(
        account_id: impl Into<String>,
        kind: OperationKind,
        cost: u64,
        artifact: impl Into<String>,
        detail: OperationDetail,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            kind,
            cost,
            artifact: artifact.into(),
            detail,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidPage(&'static str);

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// `page >= 1` and `1 <= page_size <= 100`
    pub fn new(page: u32, page_size: u32) -> Result<Self, InvalidPage> {
        if page == 0 {
            return Err(InvalidPage("page must be at least 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(InvalidPage("page size must be between 1 and 100"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub items: Vec<OperationRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u64,
}

/// Activity count for one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Short weekday name, e.g. `Mon`
    pub day: String,
    pub count: u64,
}

/// Per-account aggregates
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub total_operations: u64,
    pub by_kind: BTreeMap<OperationKind, u64>,
    /// Sum of recorded costs
    pub credits_charged: u64,
    pub recent_7d: u64,
    pub most_used: Option<OperationKind>,
    /// Oldest day first
    pub daily: Vec<DailyCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub operations: u64,
    pub credits: u64,
}

/// Ledger-wide aggregates for the admin report
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerTotals {
    pub total_operations: u64,
    pub total_credits: u64,
    pub by_kind: BTreeMap<OperationKind, KindTotals>,
    /// Operations per `YYYY-MM-DD`, only days with activity
    pub by_date: BTreeMap<String, u64>,
}

/// Append-only operation ledger
pub trait HistoryStore: Send + Sync {
    fn append(&self, record: NewOperationRecord) -> StoreResult<OperationRecord>;

    fn list(
        &self,
        account_id: &str,
        kind: Option<OperationKind>,
        page: PageRequest,
    ) -> StoreResult<HistoryPage>;

    fn recent(
        &self,
        account_id: &str,
        kind: Option<OperationKind>,
        limit: u32,
    ) -> StoreResult<Vec<OperationRecord>>;

    fn aggregate_stats(&self, account_id: &str, now: DateTime<Utc>) -> StoreResult<HistoryStats>;

    /// Delete one record owned by `account_id`. False when missing or not owned.
    fn delete_one(&self, account_id: &str, record_id: &str) -> StoreResult<bool>;

    fn delete_all(&self, account_id: &str) -> StoreResult<u64>;

    /// Totals over every account since `since`.
    fn ledger_totals(&self, since: DateTime<Utc>) -> StoreResult<LedgerTotals>;

    /// Newest records across all accounts.
    fn latest_global(&self, limit: u32) -> StoreResult<Vec<OperationRecord>>;
}

const RECORD_COLUMNS: &str = "id, account_id, kind, cost, artifact, detail, created_at";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<OperationRecord> {
    let kind_raw: String = row.get(2)?;
    let kind = OperationKind::parse(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            Box::new(StoreError::Corrupt(format!("unknown operation kind '{kind_raw}'"))),
        )
    })?;
    let detail_raw: String = row.get(5)?;
    let detail = serde_json::from_str(&detail_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(OperationRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        kind,
        cost: from_sql_int(row.get(3)?),
        artifact: row.get(4)?,
        detail,
        created_at: from_millis(row.get(6)?),
    })
}

/// Midnight (UTC) of the first day in the activity window ending on `now`.
fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = today
        .checked_sub_days(Days::new(ACTIVITY_WINDOW_DAYS - 1))
        .unwrap_or(today);
    first.and_time(NaiveTime::MIN).and_utc()
}

/// SQLite-backed ledger.
pub struct SqliteHistoryStore {
    db: Database,
}

impl SqliteHistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn query_records(&self, sql: &str, values: Vec<Value>) -> StoreResult<Vec<OperationRecord>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), record_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: NewOperationRecord) -> StoreResult<OperationRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let detail = serde_json::to_string(&record.detail)
            .map_err(|e| StoreError::Corrupt(format!("unserializable detail: {e}")))?;
        let created_at = to_millis(record.created_at);

        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO operations (id, account_id, kind, cost, artifact, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                record.account_id,
                record.kind.as_str(),
                to_sql_int(record.cost),
                record.artifact,
                detail,
                created_at,
            ],
        )?;

        Ok(OperationRecord {
            id,
            account_id: record.account_id,
            kind: record.kind,
            cost: record.cost,
            artifact: record.artifact,
            detail: record.detail,
            created_at: from_millis(created_at),
        })
    }

    fn list(
        &self,
        account_id: &str,
        kind: Option<OperationKind>,
        page: PageRequest,
    ) -> StoreResult<HistoryPage> {
        let mut filter = String::from("account_id = ?");
        let mut values = vec![Value::Text(account_id.to_string())];
        if let Some(kind) = kind {
            filter.push_str(" AND kind = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }

        let total: i64 = {
            let conn = self.db.lock();
            conn.query_row(
                &format!("SELECT COUNT(*) FROM operations WHERE {filter}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?
        };
        let total = from_sql_int(total);

        values.push(Value::Integer(i64::from(page.page_size())));
        values.push(Value::Integer(to_sql_int(page.offset())));
        let items = self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM operations WHERE {filter}
                 ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
            ),
            values,
        )?;

        Ok(HistoryPage {
            items,
            total,
            page: page.page(),
            page_size: page.page_size(),
            pages: total.div_ceil(u64::from(page.page_size())),
        })
    }

    fn recent(
        &self,
        account_id: &str,
        kind: Option<OperationKind>,
        limit: u32,
    ) -> StoreResult<Vec<OperationRecord>> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM operations WHERE account_id = ?");
        let mut values = vec![Value::Text(account_id.to_string())];
        if let Some(kind) = kind {
            sql.push_str(" AND kind = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ?");
        values.push(Value::Integer(i64::from(limit)));
        self.query_records(&sql, values)
    }

    fn aggregate_stats(&self, account_id: &str, now: DateTime<Utc>) -> StoreResult<HistoryStats> {
        let conn = self.db.lock();

        let mut by_kind: BTreeMap<OperationKind, u64> =
            OperationKind::ALL.into_iter().map(|k| (k, 0)).collect();
        let mut credits_charged = 0u64;
        {
            let mut stmt = conn.prepare(
                "SELECT kind, COUNT(*), COALESCE(SUM(cost), 0) FROM operations
                 WHERE account_id = ?1 GROUP BY kind",
            )?;
            let rows = stmt.query_map(params![account_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for row in rows {
                let (kind, count, credits) = row?;
                let kind = OperationKind::parse(&kind)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown operation kind '{kind}'")))?;
                by_kind.insert(kind, from_sql_int(count));
                credits_charged += from_sql_int(credits);
            }
        }

        let start = window_start(now);
        let mut daily: Vec<DailyCount> = (0..ACTIVITY_WINDOW_DAYS)
            .map(|offset| {
                let day = start + Duration::days(offset as i64);
                DailyCount {
                    date: day.format("%Y-%m-%d").to_string(),
                    day: day.format("%a").to_string(),
                    count: 0,
                }
            })
            .collect();
        {
            let mut stmt = conn.prepare(
                "SELECT created_at FROM operations WHERE account_id = ?1 AND created_at >= ?2",
            )?;
            let rows = stmt.query_map(params![account_id, to_millis(start)], |row| {
                row.get::<_, i64>(0)
            })?;
            for row in rows {
                let at = from_millis(row?);
                let index = (at - start).num_days();
                if let Some(bucket) = usize::try_from(index).ok().and_then(|i| daily.get_mut(i)) {
                    bucket.count += 1;
                }
            }
        }

        let total_operations = by_kind.values().sum();
        let recent_7d = daily.iter().map(|d| d.count).sum();
        let most_used = OperationKind::ALL
            .into_iter()
            .filter(|kind| by_kind.get(kind).copied().unwrap_or(0) > 0)
            .max_by(|a, b| {
                // Ties resolve to the kind listed first
                by_kind[a].cmp(&by_kind[b]).then(b.cmp(a))
            });

        Ok(HistoryStats {
            total_operations,
            by_kind,
            credits_charged,
            recent_7d,
            most_used,
            daily,
        })
    }

    fn delete_one(&self, account_id: &str, record_id: &str) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "DELETE FROM operations WHERE id = ?1 AND account_id = ?2",
            params![record_id, account_id],
        )?;
        Ok(changed == 1)
    }

    fn delete_all(&self, account_id: &str) -> StoreResult<u64> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "DELETE FROM operations WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(changed as u64)
    }

    fn ledger_totals(&self, since: DateTime<Utc>) -> StoreResult<LedgerTotals> {
        let conn = self.db.lock();
        let mut totals = LedgerTotals::default();

        let mut stmt = conn.prepare(
            "SELECT kind, COUNT(*), COALESCE(SUM(cost), 0) FROM operations
             WHERE created_at >= ?1 GROUP BY kind",
        )?;
        let rows = stmt.query_map(params![to_millis(since)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (kind, count, credits) = row?;
            let kind = OperationKind::parse(&kind)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown operation kind '{kind}'")))?;
            let entry = KindTotals {
                operations: from_sql_int(count),
                credits: from_sql_int(credits),
            };
            totals.total_operations += entry.operations;
            totals.total_credits += entry.credits;
            totals.by_kind.insert(kind, entry);
        }

        let mut stmt =
            conn.prepare("SELECT created_at FROM operations WHERE created_at >= ?1")?;
        let rows = stmt.query_map(params![to_millis(since)], |row| row.get::<_, i64>(0))?;
        for row in rows {
            let date = from_millis(row?).format("%Y-%m-%d").to_string();
            *totals.by_date.entry(date).or_insert(0) += 1;
        }

        Ok(totals)
    }

    fn latest_global(&self, limit: u32) -> StoreResult<Vec<OperationRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM operations ORDER BY created_at DESC, rowid DESC LIMIT ?"
            ),
            vec![Value::Integer(i64::from(limit))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteHistoryStore) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(&tmp.path().join("history.db")).unwrap();
        (tmp, SqliteHistoryStore::new(db))
    }

    fn record_at(
        account: &str,
        kind: OperationKind,
        cost: u64,
        at: DateTime<Utc>,
    ) -> NewOperationRecord {
        let mut record = NewOperationRecord::new(
            account,
            kind,
            cost,
            format!("tts_{cost}.mp3"),
            OperationDetail {
                text: Some(format!("item {cost}")),
                ..Default::default()
            },
        );
        record.created_at = at;
        record
    }

    #[test]
    fn page_request_bounds() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
        assert!(PageRequest::new(1, 100).is_ok());
    }

    #[test]
    fn second_page_of_twenty_five() {
        let (_tmp, store) = test_store();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        // Record n (1-based) is the n-th newest
        for n in 1..=25u64 {
            let at = base - Duration::minutes(n as i64);
            store
                .append(record_at("acct", OperationKind::TextSynthesis, n, at))
                .unwrap();
        }

        let page = store
            .list("acct", None, PageRequest::new(2, 10).unwrap())
            .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 2);
        let costs: Vec<u64> = page.items.iter().map(|r| r.cost).collect();
        assert_eq!(costs, (11..=20).collect::<Vec<_>>());
    }

    #[test]
    fn list_filters_by_kind_and_owner() {
        let (_tmp, store) = test_store();
        let now = Utc::now();
        store.append(record_at("a", OperationKind::TextSynthesis, 1, now)).unwrap();
        store.append(record_at("a", OperationKind::VoiceConversion, 2, now)).unwrap();
        store.append(record_at("b", OperationKind::VoiceConversion, 3, now)).unwrap();

        let page = store
            .list("a", Some(OperationKind::VoiceConversion), PageRequest::new(1, 20).unwrap())
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].cost, 2);
        assert_eq!(page.items[0].account_id, "a");
    }

    #[test]
    fn empty_history_has_zero_pages() {
        let (_tmp, store) = test_store();
        let page = store.list("a", None, PageRequest::new(1, 20).unwrap()).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn same_timestamp_keeps_append_order() {
        let (_tmp, store) = test_store();
        let at = Utc::now();
        store.append(record_at("a", OperationKind::TextSynthesis, 1, at)).unwrap();
        store.append(record_at("a", OperationKind::TextSynthesis, 2, at)).unwrap();
        let recent = store.recent("a", None, 5).unwrap();
        assert_eq!(recent[0].cost, 2);
        assert_eq!(recent[1].cost, 1);
    }

    #[test]
    fn delete_one_checks_ownership() {
        let (_tmp, store) = test_store();
        let record = store
            .append(record_at("owner", OperationKind::VoiceCloning, 5, Utc::now()))
            .unwrap();

        assert!(!store.delete_one("intruder", &record.id).unwrap());
        assert!(store.delete_one("owner", &record.id).unwrap());
        assert!(!store.delete_one("owner", &record.id).unwrap());
    }

    #[test]
    fn delete_all_returns_count() {
        let (_tmp, store) = test_store();
        for n in 0..4 {
            store.append(record_at("a", OperationKind::TextSynthesis, n, Utc::now())).unwrap();
        }
        store.append(record_at("b", OperationKind::TextSynthesis, 9, Utc::now())).unwrap();

        assert_eq!(store.delete_all("a").unwrap(), 4);
        assert_eq!(store.delete_all("a").unwrap(), 0);
        assert_eq!(store.recent("b", None, 10).unwrap().len(), 1);
    }

    #[test]
    fn detail_survives_storage() {
        let (_tmp, store) = test_store();
        let detail = OperationDetail {
            mode: Some("upload".to_string()),
            text: Some("سلام".to_string()),
            text_length: Some(4),
            voice_key: Some("female-1".to_string()),
            duration_seconds: Some(0.27),
            ..Default::default()
        };
        store
            .append(NewOperationRecord::new(
                "a",
                OperationKind::TextSynthesis,
                4,
                "tts_x.mp3",
                detail.clone(),
            ))
            .unwrap();
        assert_eq!(store.recent("a", None, 1).unwrap()[0].detail, detail);
    }

    #[test]
    fn aggregate_stats_buckets_last_seven_days() {
        let (_tmp, store) = test_store();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap(); // a Monday

        store.append(record_at("a", OperationKind::TextSynthesis, 10, now)).unwrap();
        store
            .append(record_at("a", OperationKind::TextSynthesis, 20, now - Duration::days(1)))
            .unwrap();
        store
            .append(record_at("a", OperationKind::VoiceConversion, 100, now - Duration::days(6)))
            .unwrap();
        // Outside the window, still counted in totals
        store
            .append(record_at("a", OperationKind::VoiceCloning, 5, now - Duration::days(7)))
            .unwrap();
        store.append(record_at("other", OperationKind::VoiceCloning, 1, now)).unwrap();

        let stats = store.aggregate_stats("a", now).unwrap();
        assert_eq!(stats.total_operations, 4);
        assert_eq!(stats.credits_charged, 135);
        assert_eq!(stats.by_kind[&OperationKind::TextSynthesis], 2);
        assert_eq!(stats.by_kind[&OperationKind::VoiceCloning], 1);
        assert_eq!(stats.recent_7d, 3);
        assert_eq!(stats.most_used, Some(OperationKind::TextSynthesis));

        assert_eq!(stats.daily.len(), 7);
        assert_eq!(stats.daily[0].date, "2025-03-04");
        assert_eq!(stats.daily[0].day, "Tue");
        assert_eq!(stats.daily[0].count, 1);
        assert_eq!(stats.daily[5].count, 1);
        assert_eq!(stats.daily[6].date, "2025-03-10");
        assert_eq!(stats.daily[6].count, 1);
    }

    #[test]
    fn aggregate_stats_for_empty_account() {
        let (_tmp, store) = test_store();
        let stats = store.aggregate_stats("nobody", Utc::now()).unwrap();
        assert_eq!(stats.total_operations, 0);
        assert_eq!(stats.most_used, None);
        assert!(stats.daily.iter().all(|d| d.count == 0));
    }

    #[test]
    fn ledger_totals_span_accounts() {
        let (_tmp, store) = test_store();
        let now = Utc::now();
        store.append(record_at("a", OperationKind::TextSynthesis, 10, now)).unwrap();
        store.append(record_at("b", OperationKind::TextSynthesis, 5, now)).unwrap();
        store.append(record_at("b", OperationKind::VoiceConversion, 100, now)).unwrap();
        store
            .append(record_at("b", OperationKind::VoiceConversion, 100, now - Duration::days(60)))
            .unwrap();

        let totals = store.ledger_totals(now - Duration::days(30)).unwrap();
        assert_eq!(totals.total_operations, 3);
        assert_eq!(totals.total_credits, 115);
        assert_eq!(
            totals.by_kind[&OperationKind::TextSynthesis],
            KindTotals { operations: 2, credits: 15 }
        );
        assert_eq!(totals.by_date.values().sum::<u64>(), 3);

        assert_eq!(store.latest_global(2).unwrap().len(), 2);
    }
}

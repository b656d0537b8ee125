//! Account records and their credit counters.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use super::{
    Database, StoreError, StoreResult, from_millis, from_sql_int, is_constraint_violation,
    to_millis, to_sql_int,
};

/// Subscription tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Starter,
    Creator,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Creator => "creator",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "starter" => Some(Plan::Starter),
            "creator" => Some(Plan::Creator),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}

/// A registered end user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: String,
    /// Login identity, lower-cased
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub plan: Plan,
    pub credits_used: u64,
    pub credits_limit: u64,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn credits_remaining(&self) -> u64 {
        self.credits_limit.saturating_sub(self.credits_used)
    }
}

/// Fields required to create an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub credits_limit: u64,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub password_hash: Option<String>,
    pub plan: Option<Plan>,
    pub credits_limit: Option<u64>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Rows removed by [`AccountStore::purge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountPurge {
    pub deleted: bool,
    pub records: u64,
    pub voices: u64,
}

/// Durable account storage with atomic credit counters
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `Conflict` when the identity or the
    /// display name is taken.
    fn create(&self, account: NewAccount) -> StoreResult<Account>;

    fn find_by_identity(&self, email: &str) -> StoreResult<Option<Account>>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Account>>;

    /// Apply a partial update. Returns false when no such account exists.
    fn update_fields(&self, id: &str, update: &AccountUpdate) -> StoreResult<bool>;

    /// Add `amount` to `credits_used` in one statement.
    fn increment_used(&self, id: &str, amount: u64) -> StoreResult<bool>;

    /// Add `amount` to `credits_used` only if the result stays within
    /// `credits_limit`. Returns false when refused or the account is missing.
    fn increment_used_within_limit(&self, id: &str, amount: u64) -> StoreResult<bool>;

    /// Point-in-time check that `limit - used >= amount`.
    fn has_capacity(&self, id: &str, amount: u64) -> StoreResult<bool>;

    /// Administrative reset of `credits_used` to zero.
    fn reset_usage(&self, id: &str) -> StoreResult<bool>;

    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Delete the account with its ledger records and cached voices in one
    /// transaction. Nothing is removed if any statement fails.
    fn purge(&self, id: &str) -> StoreResult<AccountPurge>;

    fn count(&self) -> StoreResult<u64>;
}

/// Lower-case and trim an e-mail identity.
pub fn normalize_identity(email: &str) -> String {
    email.trim().to_lowercase()
}

const ACCOUNT_COLUMNS: &str = "id, email, display_name, password_hash, avatar_url, plan, \
     credits_used, credits_limit, is_active, email_verified, created_at, updated_at, last_login_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let plan_raw: String = row.get(5)?;
    let plan = Plan::parse(&plan_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            Box::new(StoreError::Corrupt(format!("unknown plan '{plan_raw}'"))),
        )
    })?;

    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        avatar_url: row.get(4)?,
        plan,
        credits_used: from_sql_int(row.get(6)?),
        credits_limit: from_sql_int(row.get(7)?),
        is_active: row.get(8)?,
        email_verified: row.get(9)?,
        created_at: from_millis(row.get(10)?),
        updated_at: from_millis(row.get(11)?),
        last_login_at: row.get::<_, Option<i64>>(12)?.map(from_millis),
    })
}

/// SQLite-backed account store.
pub struct SqliteAccountStore {
    db: Database,
}

impl SqliteAccountStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn find_where(&self, clause: &str, value: &str) -> StoreResult<Option<Account>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {clause}");
        let account = conn
            .query_row(&sql, params![value], account_from_row)
            .optional()?;
        Ok(account)
    }
}

impl AccountStore for SqliteAccountStore {
    fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let email = normalize_identity(&account.email);
        let display_name = account.display_name.trim().to_string();
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        // Explicit checks give precise messages; the unique indexes back them up.
        let conn = self.db.lock();
        let email_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        let name_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE display_name = ?1 COLLATE NOCASE)",
            params![display_name],
            |row| row.get(0),
        )?;
        if name_taken {
            return Err(StoreError::Conflict("Username already taken".to_string()));
        }

        let result = conn.execute(
            "INSERT INTO accounts (id, email, display_name, password_hash, plan, credits_used,
                                   credits_limit, is_active, email_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 1, 0, ?7, ?7)",
            params![
                id,
                email,
                display_name,
                account.password_hash,
                Plan::Free.as_str(),
                to_sql_int(account.credits_limit),
                to_millis(now),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(StoreError::Conflict(
                    "Email or username already registered".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Account {
            id,
            email,
            display_name,
            password_hash: account.password_hash,
            avatar_url: None,
            plan: Plan::Free,
            credits_used: 0,
            credits_limit: account.credits_limit,
            is_active: true,
            email_verified: false,
            created_at: from_millis(to_millis(now)),
            updated_at: from_millis(to_millis(now)),
            last_login_at: None,
        })
    }

    fn find_by_identity(&self, email: &str) -> StoreResult<Option<Account>> {
        self.find_where("email = ?1", &normalize_identity(email))
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Account>> {
        self.find_where("id = ?1", id)
    }

    fn update_fields(&self, id: &str, update: &AccountUpdate) -> StoreResult<bool> {
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(ref name) = update.display_name {
            assignments.push("display_name = ?");
            values.push(Value::Text(name.trim().to_string()));
        }
        if let Some(ref url) = update.avatar_url {
            assignments.push("avatar_url = ?");
            values.push(Value::Text(url.clone()));
        }
        if let Some(ref hash) = update.password_hash {
            assignments.push("password_hash = ?");
            values.push(Value::Text(hash.clone()));
        }
        if let Some(plan) = update.plan {
            assignments.push("plan = ?");
            values.push(Value::Text(plan.as_str().to_string()));
        }
        if let Some(limit) = update.credits_limit {
            assignments.push("credits_limit = ?");
            values.push(Value::Integer(to_sql_int(limit)));
        }
        if let Some(active) = update.is_active {
            assignments.push("is_active = ?");
            values.push(Value::Integer(i64::from(active)));
        }
        if let Some(verified) = update.email_verified {
            assignments.push("email_verified = ?");
            values.push(Value::Integer(i64::from(verified)));
        }
        if let Some(at) = update.last_login_at {
            assignments.push("last_login_at = ?");
            values.push(Value::Integer(to_millis(at)));
        }

        assignments.push("updated_at = ?");
        values.push(Value::Integer(to_millis(Utc::now())));
        values.push(Value::Text(id.to_string()));

        let conn = self.db.lock();
        if let Some(ref name) = update.display_name {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts
                               WHERE display_name = ?1 COLLATE NOCASE AND id != ?2)",
                params![name.trim(), id],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::Conflict("Username already taken".to_string()));
            }
        }

        let sql = format!(
            "UPDATE accounts SET {} WHERE id = ?",
            assignments.join(", ")
        );
        match conn.execute(&sql, params_from_iter(values)) {
            Ok(changed) => Ok(changed == 1),
            Err(e) if is_constraint_violation(&e) => {
                Err(StoreError::Conflict("Username already taken".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn increment_used(&self, id: &str, amount: u64) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE accounts SET credits_used = credits_used + ?1, updated_at = ?2 WHERE id = ?3",
            params![to_sql_int(amount), to_millis(Utc::now()), id],
        )?;
        Ok(changed == 1)
    }

    fn increment_used_within_limit(&self, id: &str, amount: u64) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE accounts SET credits_used = credits_used + ?1, updated_at = ?2
             WHERE id = ?3 AND credits_used + ?1 <= credits_limit",
            params![to_sql_int(amount), to_millis(Utc::now()), id],
        )?;
        Ok(changed == 1)
    }

    fn has_capacity(&self, id: &str, amount: u64) -> StoreResult<bool> {
        let conn = self.db.lock();
        let counters: Option<(i64, i64)> = conn
            .query_row(
                "SELECT credits_used, credits_limit FROM accounts WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(counters.is_some_and(|(used, limit)| {
            from_sql_int(limit).saturating_sub(from_sql_int(used)) >= amount
        }))
    }

    fn reset_usage(&self, id: &str) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE accounts SET credits_used = 0, updated_at = ?1 WHERE id = ?2",
            params![to_millis(Utc::now()), id],
        )?;
        Ok(changed == 1)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    }

    fn purge(&self, id: &str) -> StoreResult<AccountPurge> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        let records = tx.execute("DELETE FROM operations WHERE account_id = ?1", params![id])?;
        let voices = tx.execute("DELETE FROM voices WHERE account_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM accounts WHERE id = ?1", params![id])? == 1;
        tx.commit()?;
        Ok(AccountPurge {
            deleted,
            records: records as u64,
            voices: voices as u64,
        })
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(from_sql_int(count))
    }
}

//! SQLite implementation of the store traits.
//!
//! [`SqliteStore`] persists changes, accounts and groups in a SQLite database
//! with WAL mode, atomic transactions on every write, and automatic schema
//! migrations. Change snapshots are stored as JSON TEXT via serde_json.
//!
//! The connection sits behind a `Mutex`, and membership updates run inside a
//! `BEGIN IMMEDIATE` transaction so that another process sharing the file
//! cannot interleave its own read-modify-write.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use critic_core::{
    Account, AccountId, ChangeId, ChangeState, GroupId, GroupUuid, InternalGroup, ObjectId,
};

use crate::error::StorageError;
use crate::hash::compute_meta_id;
use crate::traits::{AccountStore, ChangeStore, GroupStore, MemberModification};
use crate::types::{ChangeSnapshot, NewAccount, NewGroup, FIRST_ACCOUNT_ID, FIRST_GROUP_ID};

/// SQLite-backed implementation of the store traits.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // -----------------------------------------------------------------------
    // Row conversion helpers
    // -----------------------------------------------------------------------

    fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
        Ok(Account {
            id: AccountId(row.get(0)?),
            username: row.get(1)?,
            full_name: row.get(2)?,
            preferred_email: row.get(3)?,
            active: row.get(4)?,
            registered_on: row.get(5)?,
        })
    }

    fn parse_uuid(raw: &str) -> Result<GroupUuid, StorageError> {
        Uuid::parse_str(raw)
            .map(GroupUuid)
            .map_err(|e| StorageError::IntegrityError {
                reason: format!("bad group uuid '{raw}': {e}"),
            })
    }

    fn parse_meta(raw: &str) -> Result<ObjectId, StorageError> {
        ObjectId::parse(raw).map_err(|e| StorageError::IntegrityError {
            reason: e.to_string(),
        })
    }

    fn load_members(
        conn: &Connection,
        uuid: GroupUuid,
    ) -> Result<BTreeSet<AccountId>, StorageError> {
        let mut stmt =
            conn.prepare("SELECT account_id FROM group_members WHERE group_uuid = ?1")?;
        let rows = stmt.query_map(params![uuid.to_string()], |row| row.get::<_, u32>(0))?;
        let mut members = BTreeSet::new();
        for id in rows {
            members.insert(AccountId(id?));
        }
        Ok(members)
    }

    /// Loads a group selected by `where_clause` (which binds `?1`).
    fn load_group_where(
        conn: &Connection,
        where_clause: &str,
        key: &dyn rusqlite::ToSql,
    ) -> Result<Option<InternalGroup>, StorageError> {
        let sql = format!(
            "SELECT uuid, id, name, description, owner_group_uuid, visible_to_all, created_on
             FROM groups WHERE {where_clause}"
        );
        let row = conn
            .query_row(&sql, [key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .optional()?;

        let Some((uuid, id, name, description, owner, visible_to_all, created_on)) = row else {
            return Ok(None);
        };
        let uuid = Self::parse_uuid(&uuid)?;
        Ok(Some(InternalGroup {
            uuid,
            id: GroupId(id),
            name,
            description,
            owner_group_uuid: Self::parse_uuid(&owner)?,
            members: Self::load_members(conn, uuid)?,
            visible_to_all,
            created_on,
        }))
    }

    fn change_exists(conn: &Connection, id: ChangeId) -> Result<bool, StorageError> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM changes WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?)
    }
}

impl ChangeStore for SqliteStore {
    fn insert_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if Self::change_exists(&tx, state.id)? {
            return Err(StorageError::DuplicateChange(state.id.0));
        }
        let meta_id = compute_meta_id(None, state)?;
        tx.execute(
            "INSERT INTO changes (id, change_key, current_meta) VALUES (?1, ?2, ?3)",
            params![state.id.0, state.change_key, meta_id.to_hex()],
        )?;
        tx.execute(
            "INSERT INTO change_meta (meta_id, change_id, seq, parent, state_json)
             VALUES (?1, ?2, 0, NULL, ?3)",
            params![meta_id.to_hex(), state.id.0, serde_json::to_string(state)?],
        )?;
        tx.commit()?;
        Ok(meta_id)
    }

    fn update_change(&self, state: &ChangeState) -> Result<ObjectId, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let head: Option<(String, i64)> = tx
            .query_row(
                "SELECT meta_id, seq FROM change_meta WHERE change_id = ?1
                 ORDER BY seq DESC LIMIT 1",
                params![state.id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((parent_hex, seq)) = head else {
            return Err(StorageError::ChangeNotFound(state.id.0));
        };

        let parent = Self::parse_meta(&parent_hex)?;
        let meta_id = compute_meta_id(Some(parent), state)?;
        tx.execute(
            "INSERT INTO change_meta (meta_id, change_id, seq, parent, state_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                meta_id.to_hex(),
                state.id.0,
                seq + 1,
                parent_hex,
                serde_json::to_string(state)?
            ],
        )?;
        tx.execute(
            "UPDATE changes SET change_key = ?2, current_meta = ?3 WHERE id = ?1",
            params![state.id.0, state.change_key, meta_id.to_hex()],
        )?;
        tx.commit()?;
        Ok(meta_id)
    }

    fn get_change(
        &self,
        id: ChangeId,
        meta: Option<ObjectId>,
    ) -> Result<ChangeSnapshot, StorageError> {
        let conn = self.conn()?;
        if !Self::change_exists(&conn, id)? {
            return Err(StorageError::ChangeNotFound(id.0));
        }

        let row: Option<(String, String)> = match meta {
            None => conn
                .query_row(
                    "SELECT meta_id, state_json FROM change_meta WHERE change_id = ?1
                     ORDER BY seq DESC LIMIT 1",
                    params![id.0],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
            Some(meta) => conn
                .query_row(
                    "SELECT meta_id, state_json FROM change_meta
                     WHERE change_id = ?1 AND meta_id = ?2",
                    params![id.0, meta.to_hex()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
        };

        let Some((meta_hex, json)) = row else {
            return Err(StorageError::MissingMetaObject {
                change: id.0,
                meta: meta.map(|m| m.to_hex()).unwrap_or_default(),
            });
        };
        Ok(ChangeSnapshot {
            meta_id: Self::parse_meta(&meta_hex)?,
            state: serde_json::from_str(&json)?,
        })
    }

    fn find_by_key(&self, change_key: &str) -> Result<Vec<ChangeId>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM changes WHERE change_key = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![change_key], |row| row.get::<_, u32>(0))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(ChangeId(id?));
        }
        Ok(ids)
    }

    fn meta_history(&self, id: ChangeId) -> Result<Vec<ObjectId>, StorageError> {
        let conn = self.conn()?;
        if !Self::change_exists(&conn, id)? {
            return Err(StorageError::ChangeNotFound(id.0));
        }
        let mut stmt =
            conn.prepare("SELECT meta_id FROM change_meta WHERE change_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![id.0], |row| row.get::<_, String>(0))?;
        let mut history = Vec::new();
        for raw in rows {
            history.push(Self::parse_meta(&raw?)?);
        }
        Ok(history)
    }
}

impl AccountStore for SqliteStore {
    fn create_account(&self, account: &NewAccount) -> Result<Account, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(username) = &account.username {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StorageError::DuplicateUsername(username.clone()));
            }
        }
        let id: u32 = tx.query_row(
            "SELECT COALESCE(MAX(id) + 1, ?1) FROM accounts",
            params![FIRST_ACCOUNT_ID],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO accounts (id, username, full_name, preferred_email, active, registered_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                account.username,
                account.full_name,
                account.preferred_email,
                account.active,
                account.registered_on
            ],
        )?;
        tx.commit()?;

        Ok(Account {
            id: AccountId(id),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            preferred_email: account.preferred_email.clone(),
            active: account.active,
            registered_on: account.registered_on,
        })
    }

    fn get_account(&self, id: AccountId) -> Result<Account, StorageError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, full_name, preferred_email, active, registered_on
             FROM accounts WHERE id = ?1",
            params![id.0],
            Self::row_to_account,
        )
        .optional()?
        .ok_or(StorageError::AccountNotFound(id.0))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Account>, StorageError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, username, full_name, preferred_email, active, registered_on
                 FROM accounts WHERE username = ?1",
                params![username],
                Self::row_to_account,
            )
            .optional()?)
    }

    fn find_by_email(&self, email: &str) -> Result<Vec<Account>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, preferred_email, active, registered_on
             FROM accounts WHERE preferred_email = ?1 COLLATE NOCASE ORDER BY id",
        )?;
        let rows = stmt.query_map(params![email], Self::row_to_account)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_by_full_name(&self, full_name: &str) -> Result<Vec<Account>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, preferred_email, active, registered_on
             FROM accounts WHERE full_name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![full_name], Self::row_to_account)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn set_active(&self, id: AccountId, active: bool) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET active = ?2 WHERE id = ?1",
            params![id.0, active],
        )?;
        if updated == 0 {
            return Err(StorageError::AccountNotFound(id.0));
        }
        Ok(())
    }
}

impl GroupStore for SqliteStore {
    fn create_group(&self, group: &NewGroup) -> Result<InternalGroup, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE name = ?1)",
            params![group.name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StorageError::DuplicateGroupName(group.name.clone()));
        }
        if let Some(owner) = group.owner_group_uuid {
            let owner_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1)",
                params![owner.to_string()],
                |row| row.get(0),
            )?;
            if !owner_exists {
                return Err(StorageError::GroupNotFound(owner.to_string()));
            }
        }

        let uuid = GroupUuid::new_random();
        let id: u32 = tx.query_row(
            "SELECT COALESCE(MAX(id) + 1, ?1) FROM groups",
            params![FIRST_GROUP_ID],
            |row| row.get(0),
        )?;
        let owner = group.owner_group_uuid.unwrap_or(uuid);
        tx.execute(
            "INSERT INTO groups (uuid, id, name, description, owner_group_uuid, visible_to_all, created_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid.to_string(),
                id,
                group.name,
                group.description,
                owner.to_string(),
                group.visible_to_all,
                group.created_on
            ],
        )?;
        for member in &group.members {
            tx.execute(
                "INSERT INTO group_members (group_uuid, account_id) VALUES (?1, ?2)",
                params![uuid.to_string(), member.0],
            )?;
        }
        tx.commit()?;

        Ok(InternalGroup {
            uuid,
            id: GroupId(id),
            name: group.name.clone(),
            description: group.description.clone(),
            owner_group_uuid: owner,
            members: group.members.clone(),
            visible_to_all: group.visible_to_all,
            created_on: group.created_on,
        })
    }

    fn get_group(&self, uuid: GroupUuid) -> Result<InternalGroup, StorageError> {
        let conn = self.conn()?;
        Self::load_group_where(&conn, "uuid = ?1", &uuid.to_string())?
            .ok_or_else(|| StorageError::GroupNotFound(uuid.to_string()))
    }

    fn find_group_by_name(&self, name: &str) -> Result<Option<InternalGroup>, StorageError> {
        let conn = self.conn()?;
        Self::load_group_where(&conn, "name = ?1", &name)
    }

    fn find_group_by_id(&self, id: GroupId) -> Result<Option<InternalGroup>, StorageError> {
        let conn = self.conn()?;
        Self::load_group_where(&conn, "id = ?1", &id.0)
    }

    fn update_members(
        &self,
        uuid: GroupUuid,
        modification: MemberModification<'_>,
    ) -> Result<InternalGroup, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let key = uuid.to_string();
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1)",
            params![key],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::GroupNotFound(key));
        }

        let current = Self::load_members(&tx, uuid)?;
        let next = modification(&current);
        for removed in current.difference(&next) {
            tx.execute(
                "DELETE FROM group_members WHERE group_uuid = ?1 AND account_id = ?2",
                params![key, removed.0],
            )?;
        }
        for added in next.difference(&current) {
            tx.execute(
                "INSERT INTO group_members (group_uuid, account_id) VALUES (?1, ?2)",
                params![key, added.0],
            )?;
        }

        let group = Self::load_group_where(&tx, "uuid = ?1", &key)?
            .ok_or_else(|| StorageError::GroupNotFound(key.clone()))?;
        tx.commit()?;
        Ok(group)
    }

    fn groups_containing(&self, account: AccountId) -> Result<Vec<GroupUuid>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT group_uuid FROM group_members WHERE account_id = ?1 ORDER BY group_uuid",
        )?;
        let rows = stmt.query_map(params![account.0], |row| row.get::<_, String>(0))?;
        let mut uuids = Vec::new();
        for raw in rows {
            uuids.push(Self::parse_uuid(&raw?)?);
        }
        uuids.sort();
        Ok(uuids)
    }

    fn delete_group(&self, uuid: GroupUuid) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM groups WHERE uuid = ?1",
            params![uuid.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::GroupNotFound(uuid.to_string()));
        }
        Ok(())
    }
}

// used for persistence
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{KeyschemaError, Result};
use crate::store::{Inserted, Store};

// ------------- Persistence -------------
/// A [`Store`] kept in SQLite, either in a file or in memory.
///
/// Scalars live in the `Scalar` table and ordered set members in the `Member`
/// table. A key that has both scalar and member rows is enumerated once.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        debug!(path, "opening sqlite store");
        Self::with_connection(Connection::open(path)?)
    }
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }
    pub fn with_connection(connection: Connection) -> Result<Self> {
        // The "STRICT" keyword introduced in 3.37.0 breaks JDBC connections, which makes
        // debugging using an external tool like DBeaver impossible
        connection.execute_batch(
            "
            create table if not exists Scalar (
                Key text not null,
                Value text not null,
                constraint unique_and_referenceable_Key primary key (
                    Key
                )
            );-- STRICT;
            create table if not exists Member (
                SetKey text not null,
                Member text not null,
                Ordinal integer not null,
                constraint unique_Member primary key (
                    SetKey,
                    Member
                )
            );-- STRICT;
            create index if not exists Member_in_order on Member (
                SetKey,
                Ordinal,
                Member
            );
            ",
        )?;
        Ok(Self { connection })
    }
    fn ordinal_of(&self, set: &str, member: &str) -> Result<Option<i64>> {
        Ok(self
            .connection
            .prepare_cached(
                "
                select Ordinal
                    from Member
                    where SetKey = ?1
                    and Member = ?2
            ",
            )?
            .query_row(params![set, member], |r| r.get(0))
            .optional()?)
    }
}

impl Store for SqliteStore {
    fn insert_member(&mut self, set: &str, member: &str, ordinal: i64) -> Result<Inserted> {
        let changed = self
            .connection
            .prepare_cached(
                "
                insert or ignore into Member (
                    SetKey,
                    Member,
                    Ordinal
                ) values (?1, ?2, ?3)
            ",
            )?
            .execute(params![set, member, ordinal])?;
        Ok(if changed == 0 { Inserted::AlreadyPresent } else { Inserted::Inserted })
    }
    fn rank_of(&self, set: &str, member: &str) -> Result<Option<usize>> {
        let Some(ordinal) = self.ordinal_of(set, member)? else {
            return Ok(None);
        };
        let rank: i64 = self
            .connection
            .prepare_cached(
                "
                select count(*)
                    from Member
                    where SetKey = ?1
                    and (Ordinal < ?2 or (Ordinal = ?2 and Member < ?3))
            ",
            )?
            .query_row(params![set, ordinal, member], |r| r.get(0))?;
        Ok(Some(rank as usize))
    }
    fn member_count(&self, set: &str) -> Result<usize> {
        let count: i64 = self
            .connection
            .prepare_cached("select count(*) from Member where SetKey = ?1")?
            .query_row(params![set], |r| r.get(0))?;
        Ok(count as usize)
    }
    fn member_at(&self, set: &str, index: usize) -> Result<Option<String>> {
        Ok(self
            .connection
            .prepare_cached(
                "
                select Member
                    from Member
                    where SetKey = ?1
                    order by Ordinal, Member
                    limit 1 offset ?2
            ",
            )?
            .query_row(params![set, index as i64], |r| r.get(0))
            .optional()?)
    }
    fn delete_set(&mut self, set: &str) -> Result<()> {
        self.connection
            .prepare_cached("delete from Member where SetKey = ?1")?
            .execute(params![set])?;
        Ok(())
    }
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .connection
            .prepare_cached("select Value from Scalar where Key = ?1")?
            .query_row(params![key], |r| r.get(0))
            .optional()?)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.connection
            .prepare_cached(
                "
                insert into Scalar (
                    Key,
                    Value
                ) values (?1, ?2)
                on conflict (Key) do update set Value = excluded.Value
            ",
            )?
            .execute(params![key, value])?;
        Ok(())
    }
    fn increment(&mut self, key: &str) -> Result<i64> {
        let current = match self.get(key)? {
            None => 0,
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                KeyschemaError::Store(format!("value of '{key}' is not an integer"))
            })?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| KeyschemaError::Store(format!("increment of '{key}' would overflow")))?;
        self.set(key, &next.to_string())?;
        Ok(next)
    }
    fn delete(&mut self, key: &str) -> Result<bool> {
        let scalars = self
            .connection
            .prepare_cached("delete from Scalar where Key = ?1")?
            .execute(params![key])?;
        let members = self
            .connection
            .prepare_cached("delete from Member where SetKey = ?1")?
            .execute(params![key])?;
        Ok(scalars + members > 0)
    }
    fn keys(&self) -> Result<Vec<String>> {
        let mut statement = self.connection.prepare_cached(
            "
            select Key from Scalar
            union
            select SetKey from Member
            order by 1
        ",
        )?;
        let keys = statement
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

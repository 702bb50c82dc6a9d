// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::Transaction;

use crate::error::Fallible;
use crate::store::ConfigStore;
use crate::types::timestamp::Timestamp;

/// SQLite-backed settings store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        {
            let tx = conn.transaction()?;
            if !schema_exists(&tx)? {
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// When the given key was last written, if ever.
    pub fn last_saved(&self, key: &str) -> Fallible<Option<Timestamp>> {
        let conn = self.acquire();
        let mut stmt = conn.prepare("select updated_at from settings where key = ?;")?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            let updated_at: Timestamp = row.get(0)?;
            Ok(Some(updated_at))
        } else {
            Ok(None)
        }
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

impl ConfigStore for Database {
    fn read(&self, key: &str) -> Fallible<Option<String>> {
        let conn = self.acquire();
        let mut stmt = conn.prepare("select value from settings where key = ?;")?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn write(&self, key: &str, value: &str) -> Fallible<()> {
        log::debug!("Saving setting '{key}'");
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        let sql = "insert into settings (key, value, updated_at) values (?, ?, ?) on conflict (key) do update set value = excluded.value, updated_at = excluded.updated_at;";
        tx.execute(sql, (key, value, Timestamp::now()))?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Fallible<()> {
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        tx.execute("delete from settings where key = ?;", [key])?;
        tx.commit()?;
        Ok(())
    }
}

fn schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["settings"], |row| row.get(0))?;
    Ok(count > 0)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::contact::{Contact, ContactUpdate, NewContact};
use crate::search;

const DB_FILE_NAME: &str = "contacts.db";

const CONTACT_COLUMNS: &str =
    "id, first, last, avatar, twitter, notes, favorite, created_at";

pub struct Database {
    conn: Connection,
}

/// Default location of the contacts database.
pub fn default_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine data directories")?;
    Ok(base.data_dir().join("rolodex").join(DB_FILE_NAME))
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create data dir: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        let mut db = Self { conn };
        db.setup()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.setup()?;
        Ok(db)
    }

    fn setup(&mut self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "FULL")?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
              id         TEXT PRIMARY KEY,
              first      TEXT,
              last       TEXT,
              avatar     TEXT,
              twitter    TEXT,
              notes      TEXT,
              favorite   INTEGER NOT NULL DEFAULT 0,
              created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contacts_last ON contacts(last);
        "#,
        )?;

        // Older databases predate the search column
        self.ensure_name_norm_column()?;
        self.backfill_name_norm()?;
        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_contacts_name_norm ON contacts(name_norm);",
        )?;
        Ok(())
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let rows = stmt.query_map([], |row: &Row| -> rusqlite::Result<String> { row.get(1) })?;
        for r in rows {
            if r? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn ensure_name_norm_column(&mut self) -> Result<()> {
        if !self.column_exists("contacts", "name_norm")? {
            self.conn
                .execute_batch("ALTER TABLE contacts ADD COLUMN name_norm TEXT;")?;
        }
        Ok(())
    }

    fn backfill_name_norm(&mut self) -> Result<()> {
        let pending: Vec<(String, Option<String>, Option<String>)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, first, last FROM contacts WHERE name_norm IS NULL")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            let mut acc = Vec::new();
            for r in rows {
                acc.push(r?);
            }
            acc
        };
        if pending.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut upd = tx.prepare("UPDATE contacts SET name_norm = ?1 WHERE id = ?2")?;
            for (id, first, last) in pending {
                let norm = search::name_key(first.as_deref(), last.as_deref());
                upd.execute(params![norm, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert(&mut self, new: &NewContact) -> Result<Contact> {
        let id = Uuid::new_v4().simple().to_string();
        let created_at = OffsetDateTime::now_utc().unix_timestamp();
        let contact = Contact::from_new(id, new, created_at);
        self.write(&contact)?;
        Ok(contact)
    }

    pub fn get(&self, id: &str) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?1", CONTACT_COLUMNS);
        let contact = self
            .conn
            .query_row(&sql, [id], row_to_contact)
            .optional()?;
        Ok(contact)
    }

    /// Apply a partial update. Returns `None` when no contact has this id.
    pub fn update(&mut self, id: &str, update: &ContactUpdate) -> Result<Option<Contact>> {
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(current));
        }
        let merged = update.apply_to(&current);
        self.write(&merged)?;
        Ok(Some(merged))
    }

    /// Returns `true` when a row was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// List contacts ordered by last name, then creation time.
    /// With a filter, only contacts whose name contains it are returned.
    pub fn list(&self, filter: Option<&str>) -> Result<Vec<Contact>> {
        let mut sql = format!("SELECT {} FROM contacts", CONTACT_COLUMNS);
        let pattern = filter
            .and_then(search::normalize_query)
            .map(|normalized| search::like_pattern(&normalized));
        if pattern.is_some() {
            sql.push_str(" WHERE name_norm LIKE ?1 ESCAPE '\\'");
        }
        sql.push_str(" ORDER BY last COLLATE NOCASE, created_at");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match &pattern {
            Some(pattern) => stmt.query_map([pattern.as_str()], row_to_contact)?,
            None => stmt.query_map([], row_to_contact)?,
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn write(&mut self, contact: &Contact) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            r#"
            INSERT INTO contacts (id, first, last, avatar, twitter, notes, favorite, created_at, name_norm)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
              first=excluded.first,
              last=excluded.last,
              avatar=excluded.avatar,
              twitter=excluded.twitter,
              notes=excluded.notes,
              favorite=excluded.favorite,
              name_norm=excluded.name_norm
        "#,
            params![
                contact.id,
                contact.first,
                contact.last,
                contact.avatar,
                contact.twitter,
                contact.notes,
                if contact.favorite { 1 } else { 0 },
                contact.created_at,
                search::name_key(contact.first.as_deref(), contact.last.as_deref()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        first: row.get(1)?,
        last: row.get(2)?,
        avatar: row.get(3)?,
        twitter: row.get(4)?,
        notes: row.get(5)?,
        favorite: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_contact(first: &str, last: &str) -> NewContact {
        NewContact {
            first: Some(first.to_string()),
            last: Some(last.to_string()),
            ..NewContact::default()
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut db = Database::open_in_memory().unwrap();
        let created = db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        let fetched = db.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(!fetched.favorite);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_favorite() {
        let mut db = Database::open_in_memory().unwrap();
        let created = db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        let updated = db
            .update(&created.id, &ContactUpdate::favorite(true))
            .unwrap()
            .unwrap();
        assert!(updated.favorite);
        assert!(db.get(&created.id).unwrap().unwrap().favorite);
    }

    #[test]
    fn test_update_missing_returns_none() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db
            .update("missing", &ContactUpdate::favorite(true))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete() {
        let mut db = Database::open_in_memory().unwrap();
        let created = db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        assert!(db.delete(&created.id).unwrap());
        assert!(!db.delete(&created.id).unwrap());
        assert!(db.get(&created.id).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_by_last_name() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert(&new_contact("Grace", "hopper")).unwrap();
        db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        db.insert(&new_contact("Alan", "Turing")).unwrap();

        let names: Vec<_> = db
            .list(None)
            .unwrap()
            .into_iter()
            .filter_map(|c| c.last)
            .collect();
        assert_eq!(names, vec!["hopper", "Lovelace", "Turing"]);
    }

    #[test]
    fn test_list_filter_matches_name_parts() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        db.insert(&new_contact("Alan", "Turing")).unwrap();

        let found = db.list(Some("love")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first.as_deref(), Some("Ada"));

        let found = db.list(Some("a")).unwrap();
        assert_eq!(found.len(), 2);

        let found = db.list(Some("%")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("contacts.db");
        let mut db = Database::open(&path).unwrap();
        db.insert(&new_contact("Ada", "Lovelace")).unwrap();
        assert!(path.exists());
    }
}

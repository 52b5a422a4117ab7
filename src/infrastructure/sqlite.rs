//! SQLite-backed identity, revision and progress store

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{IdentitySnapshot, UserSkill};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{IdentityStore, ProgressStore, RevisionStore};

const MIGRATIONS: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS skills (
         code TEXT PRIMARY KEY NOT NULL,
         id   TEXT NOT NULL
     );
     CREATE TABLE IF NOT EXISTS last_revision (
         revision TEXT NOT NULL
     );",
    "CREATE TABLE IF NOT EXISTS user_skills (
         user_id  TEXT NOT NULL,
         skill_id TEXT NOT NULL,
         level    INTEGER NOT NULL,
         PRIMARY KEY (user_id, skill_id)
     );",
];

pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Store holding all persisted state in one SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and migrate) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> InfraResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InfraError::io(format!("create {}", parent.display()), e)
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|source| InfraError::Database {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn).map_err(|source| InfraError::Database {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Database that lives only as long as the store.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> ApplicationResult<u32> {
        self.conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(storage_err)
    }
}

fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let target_version = (idx + 1) as u32;
        if current_version >= target_version {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.pragma_update(None, "user_version", target_version)?;
        debug!("migrated database to version {}", target_version);
    }
    Ok(())
}

fn storage_err(e: rusqlite::Error) -> ApplicationError {
    ApplicationError::Storage {
        message: e.to_string(),
    }
}

fn parse_uuid(raw: &str) -> ApplicationResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ApplicationError::Storage {
        message: format!("corrupt identifier {raw:?}: {e}"),
    })
}

impl IdentityStore for SqliteStore {
    #[instrument(level = "debug", skip(self))]
    fn load_all(&self) -> ApplicationResult<IdentitySnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT code, id FROM skills")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(storage_err)?;

        let mut by_code = HashMap::new();
        for row in rows {
            let (code, id) = row.map_err(storage_err)?;
            by_code.insert(code, parse_uuid(&id)?);
        }
        Ok(IdentitySnapshot::new(by_code))
    }

    fn save(&self, id: Uuid, code: &str) -> ApplicationResult<()> {
        self.conn
            .execute(
                "INSERT INTO skills (code, id) VALUES (?1, ?2)
                 ON CONFLICT(code) DO UPDATE SET id = excluded.id
                 WHERE skills.id <> excluded.id",
                params![code, id.to_string()],
            )
            .map_err(storage_err)?;
        Ok(())
    }
}

impl RevisionStore for SqliteStore {
    fn save_revision(&self, revision: &str) -> ApplicationResult<()> {
        let updated = self
            .conn
            .execute("UPDATE last_revision SET revision = ?1", params![revision])
            .map_err(storage_err)?;
        if updated == 0 {
            self.conn
                .execute(
                    "INSERT INTO last_revision (revision) VALUES (?1)",
                    params![revision],
                )
                .map_err(storage_err)?;
        }
        Ok(())
    }

    fn load_revision(&self) -> ApplicationResult<Option<String>> {
        self.conn
            .query_row("SELECT revision FROM last_revision LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_err)
    }
}

impl ProgressStore for SqliteStore {
    fn user_skills(&self, user_id: &str) -> ApplicationResult<Vec<UserSkill>> {
        let mut stmt = self
            .conn
            .prepare("SELECT skill_id, level FROM user_skills WHERE user_id = ?1 ORDER BY skill_id")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(storage_err)?;

        let mut skills = Vec::new();
        for row in rows {
            let (skill_id, level) = row.map_err(storage_err)?;
            skills.push(UserSkill::new(parse_uuid(&skill_id)?, level));
        }
        Ok(skills)
    }

    fn update_user_skills(&self, user_id: &str, skills: &[UserSkill]) -> ApplicationResult<()> {
        for skill in skills {
            self.conn
                .execute(
                    "INSERT INTO user_skills (user_id, skill_id, level) VALUES (?1, ?2, ?3)
                     ON CONFLICT(user_id, skill_id) DO UPDATE SET level = excluded.level",
                    params![user_id, skill.skill_id.to_string(), skill.level],
                )
                .map_err(storage_err)?;
        }
        Ok(())
    }
}

//! SQLite-backed durable state.
//!
//! Holds the chosen home point and whether tracking was requested, so a
//! restarted process can pick up where it left off. Coordinates are stored
//! at `f32` precision.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::error::PersistenceError;
use crate::geo::GeoPoint;

const KEY_LATITUDE: &str = "home.latitude";
const KEY_LONGITUDE: &str = "home.longitude";
const KEY_DISPLAY_NAME: &str = "home.display_name";
const KEY_TRACKING_REQUESTED: &str = "tracking_requested";

pub struct HomeStore {
    conn: Connection,
}

impl HomeStore {
    /// Open the store at `<data dir>/proximity.db`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open() -> Result<Self, PersistenceError> {
        let path = data_dir()?.join("proximity.db");
        Self::open_at(&path)
    }

    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }

    /// Persist `home`, replacing any previous one in a single transaction.
    ///
    /// # Errors
    /// Returns an error if the write fails; nothing is written in that case.
    pub fn save_home(&mut self, home: &GeoPoint) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        for (key, value) in [
            (KEY_LATITUDE, (home.latitude as f32).to_string()),
            (KEY_LONGITUDE, (home.longitude as f32).to_string()),
            (KEY_DISPLAY_NAME, home.display_name.clone()),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        tracing::debug!(display_name = %home.display_name, "home persisted");
        Ok(())
    }

    /// The persisted home, if any.
    ///
    /// # Errors
    /// Returns `Corrupt` if only part of the record is present, a
    /// coordinate does not parse, or the point is not finite and in range.
    pub fn load_home(&self) -> Result<Option<GeoPoint>, PersistenceError> {
        let lat = self.kv_get(KEY_LATITUDE)?;
        let lon = self.kv_get(KEY_LONGITUDE)?;
        let name = self.kv_get(KEY_DISPLAY_NAME)?;

        match (lat, lon) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => {
                let home = GeoPoint::new(
                    parse_f32(KEY_LATITUDE, &lat)?,
                    parse_f32(KEY_LONGITUDE, &lon)?,
                    name.unwrap_or_default(),
                );
                if home.validate().is_err() {
                    return Err(PersistenceError::Corrupt {
                        key: "home".into(),
                        value: format!("({lat}, {lon})"),
                    });
                }
                Ok(Some(home))
            }
            (Some(_), None) => Err(PersistenceError::Corrupt {
                key: KEY_LONGITUDE.into(),
                value: "<missing>".into(),
            }),
            (None, Some(_)) => Err(PersistenceError::Corrupt {
                key: KEY_LATITUDE.into(),
                value: "<missing>".into(),
            }),
        }
    }

    /// Remove the home record.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn clear_home(&mut self) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM kv WHERE key IN (?1, ?2, ?3)",
            params![KEY_LATITUDE, KEY_LONGITUDE, KEY_DISPLAY_NAME],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the write fails.
    pub fn set_tracking_requested(&self, requested: bool) -> Result<(), PersistenceError> {
        self.kv_set(KEY_TRACKING_REQUESTED, if requested { "true" } else { "false" })
    }

    /// Whether tracking was left on; `false` if never set.
    ///
    /// # Errors
    /// Returns an error if the read fails or the value is not a bool.
    pub fn tracking_requested(&self) -> Result<bool, PersistenceError> {
        match self.kv_get(KEY_TRACKING_REQUESTED)? {
            None => Ok(false),
            Some(v) => v.parse::<bool>().map_err(|_| PersistenceError::Corrupt {
                key: KEY_TRACKING_REQUESTED.into(),
                value: v,
            }),
        }
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn parse_f32(key: &str, value: &str) -> Result<f64, PersistenceError> {
    value
        .parse::<f32>()
        .map(f64::from)
        .map_err(|_| PersistenceError::Corrupt {
            key: key.into(),
            value: value.into(),
        })
}

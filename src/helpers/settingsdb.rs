use std::path::{Path, PathBuf};
use std::sync::Mutex;
use log::{debug, info};
use rusqlite::{params, Connection};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize setting '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot prepare settings directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings database lock poisoned")]
    Poisoned,
}

/// A persistent settings database that stores user settings as key-value
/// pairs, values encoded as JSON, in a single SQLite table
pub struct SettingsDb {
    /// Path to the database file
    db_path: PathBuf,
    conn: Mutex<Connection>,
}

impl SettingsDb {
    /// Open (or create) the database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        info!("Successfully opened settings database at {:?}", db_path);
        Self::setup(&conn)?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    /// Database that lives only as long as this value
    pub fn in_memory() -> Result<Self, SettingsError> {
        let conn = Connection::open_in_memory()?;
        Self::setup(&conn)?;
        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    fn setup(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;
        debug!("Settings table created or verified successfully");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, SettingsError>
    where
        F: FnOnce(&Connection) -> Result<T, SettingsError>,
    {
        let conn = self.conn.lock().map_err(|_| SettingsError::Poisoned)?;
        f(&conn)
    }

    /// Store a serializable value
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        let serialized = serde_json::to_string(value).map_err(|source| SettingsError::Serialization {
            key: key.to_string(),
            source,
        })?;
        debug!("Setting {} = {}", key, serialized);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, serialized],
            )?;
            Ok(())
        })
    }

    /// Get a value and deserialize it
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        let raw = self.get_raw(key)?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| SettingsError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Get the stored JSON text
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, SettingsError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
            match stmt.query_row(params![key], |row| row.get::<_, String>(0)) {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_string_with_default(&self, key: &str, default: &str) -> Result<String, SettingsError> {
        Ok(self.get::<String>(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn get_int_with_default(&self, key: &str, default: i64) -> Result<i64, SettingsError> {
        Ok(self.get::<i64>(key)?.unwrap_or(default))
    }

    pub fn get_bool_with_default(&self, key: &str, default: bool) -> Result<bool, SettingsError> {
        Ok(self.get::<bool>(key)?.unwrap_or(default))
    }

    /// Remove a setting, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool, SettingsError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM settings WHERE key = ?1", params![key])? > 0))
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, SettingsError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// All keys, sorted
    pub fn get_all_keys(&self) -> Result<Vec<String>, SettingsError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM settings ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for key in rows {
                keys.push(key?);
            }
            Ok(keys)
        })
    }

    /// Remove every setting
    pub fn clear(&self) -> Result<(), SettingsError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM settings", [])?;
            Ok(())
        })
    }

    pub fn len(&self) -> Result<usize, SettingsError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn is_empty(&self) -> Result<bool, SettingsError> {
        Ok(self.len()? == 0)
    }
}

pub const KEY_I2S_OUTPUT: &str = "i2s_output";
pub const KEY_AUDIO_VOLUME: &str = "audio_volume";
pub const KEY_BACKLIGHT_LEVEL: &str = "backlight_level";
pub const KEY_BACKLIGHT_DIM_LEVEL: &str = "backlight_dim_level";
pub const KEY_BACKLIGHT_TIMEOUT: &str = "backlight_timeout_secs";
pub const KEY_SCAN_ON_BOOT: &str = "scan_on_boot";

pub const DEFAULT_AUDIO_VOLUME: u8 = 20;

/// Typed access to the device settings
pub struct UserSettings {
    db: SettingsDb,
}

impl UserSettings {
    pub fn new(db: SettingsDb) -> Self {
        Self { db }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        Ok(Self::new(SettingsDb::open(path)?))
    }

    pub fn db(&self) -> &SettingsDb {
        &self.db
    }

    fn get_u8(&self, key: &str, default: u8) -> Result<u8, SettingsError> {
        let value = self.db.get_int_with_default(key, i64::from(default))?;
        Ok(u8::try_from(value).unwrap_or(default))
    }

    /// Audio output route
    pub fn i2s_output(&self) -> Result<u8, SettingsError> {
        self.get_u8(KEY_I2S_OUTPUT, 0)
    }

    pub fn set_i2s_output(&self, output: u8) -> Result<(), SettingsError> {
        self.db.set(KEY_I2S_OUTPUT, &output)
    }

    pub fn audio_volume(&self) -> Result<u8, SettingsError> {
        self.get_u8(KEY_AUDIO_VOLUME, DEFAULT_AUDIO_VOLUME)
    }

    pub fn set_audio_volume(&self, volume: u8) -> Result<(), SettingsError> {
        self.db.set(KEY_AUDIO_VOLUME, &volume)
    }

    pub fn backlight_level(&self) -> Result<u8, SettingsError> {
        self.get_u8(KEY_BACKLIGHT_LEVEL, 100)
    }

    pub fn set_backlight_level(&self, level: u8) -> Result<(), SettingsError> {
        self.db.set(KEY_BACKLIGHT_LEVEL, &level)
    }

    pub fn backlight_dim_level(&self) -> Result<u8, SettingsError> {
        self.get_u8(KEY_BACKLIGHT_DIM_LEVEL, 10)
    }

    pub fn set_backlight_dim_level(&self, level: u8) -> Result<(), SettingsError> {
        self.db.set(KEY_BACKLIGHT_DIM_LEVEL, &level)
    }

    pub fn backlight_timeout_secs(&self) -> Result<u32, SettingsError> {
        let value = self.db.get_int_with_default(KEY_BACKLIGHT_TIMEOUT, 60)?;
        Ok(u32::try_from(value).unwrap_or(60))
    }

    pub fn set_backlight_timeout_secs(&self, secs: u32) -> Result<(), SettingsError> {
        self.db.set(KEY_BACKLIGHT_TIMEOUT, &secs)
    }

    pub fn scan_on_boot(&self) -> Result<bool, SettingsError> {
        self.db.get_bool_with_default(KEY_SCAN_ON_BOOT, false)
    }

    pub fn set_scan_on_boot(&self, enabled: bool) -> Result<(), SettingsError> {
        self.db.set(KEY_SCAN_ON_BOOT, &enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let db = SettingsDb::open(temp_dir.path().join("settings.db")).unwrap();

        db.set("test_string", "hello world").unwrap();
        db.set("test_int", &42i64).unwrap();
        db.set("test_bool", &true).unwrap();

        assert_eq!(db.get::<String>("test_string").unwrap(), Some("hello world".to_string()));
        assert_eq!(db.get::<i64>("test_int").unwrap(), Some(42));
        assert_eq!(db.get::<bool>("test_bool").unwrap(), Some(true));
        assert_eq!(db.get::<String>("missing").unwrap(), None);

        assert_eq!(db.get_string_with_default("missing", "default").unwrap(), "default");
        assert_eq!(db.get_int_with_default("missing", 7).unwrap(), 7);
        assert!(db.get_bool_with_default("missing", true).unwrap());

        assert!(db.contains_key("test_int").unwrap());
        assert!(db.remove("test_int").unwrap());
        assert!(!db.remove("test_int").unwrap());
        assert!(!db.contains_key("test_int").unwrap());

        assert_eq!(db.get_all_keys().unwrap(), vec!["test_bool", "test_string"]);
        db.clear().unwrap();
        assert!(db.is_empty().unwrap());
    }

    #[test]
    #[serial]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.db");
        {
            let db = SettingsDb::open(&path).unwrap();
            db.set("audio_volume", &35u8).unwrap();
            db.set("audio_volume", &40u8).unwrap();
        }
        let db = SettingsDb::open(&path).unwrap();
        assert_eq!(db.get::<u8>("audio_volume").unwrap(), Some(40));
        assert_eq!(db.len().unwrap(), 1);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let db = SettingsDb::in_memory().unwrap();
        db.set("name", "kitchen").unwrap();
        assert!(matches!(db.get::<i64>("name"), Err(SettingsError::Serialization { .. })));
    }

    #[test]
    fn test_user_settings_defaults() {
        let settings = UserSettings::new(SettingsDb::in_memory().unwrap());
        assert_eq!(settings.i2s_output().unwrap(), 0);
        assert_eq!(settings.audio_volume().unwrap(), 20);
        assert_eq!(settings.backlight_level().unwrap(), 100);
        assert_eq!(settings.backlight_dim_level().unwrap(), 10);
        assert_eq!(settings.backlight_timeout_secs().unwrap(), 60);
        assert!(!settings.scan_on_boot().unwrap());
    }

    #[test]
    fn test_user_settings_round_trip() {
        let settings = UserSettings::new(SettingsDb::in_memory().unwrap());
        settings.set_audio_volume(55).unwrap();
        settings.set_i2s_output(1).unwrap();
        settings.set_scan_on_boot(true).unwrap();
        settings.set_backlight_timeout_secs(300).unwrap();
        assert_eq!(settings.audio_volume().unwrap(), 55);
        assert_eq!(settings.i2s_output().unwrap(), 1);
        assert!(settings.scan_on_boot().unwrap());
        assert_eq!(settings.backlight_timeout_secs().unwrap(), 300);
    }
}

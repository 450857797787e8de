//! Change-tracking session contents.

use crate::codec::SessionData;
use crate::error::{SessionError, SessionResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which flash messages are stored unless another is given.
pub const DEFAULT_FLASH_KEY: &str = "_flash";

/// A one-shot message stored in the session until it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// One user's session data for one session name.
///
/// Every mutating method sets the modified flag, whether or not the contents
/// actually change; reads never do. The store uses the flag to decide
/// whether the session has to be written back. Equality compares contents
/// only.
#[derive(Debug, Clone, Default)]
pub struct SessionDict {
    data: SessionData,
    new: bool,
    modified: bool,
}

impl SessionDict {
    /// An empty session that did not exist before this request.
    pub fn new() -> Self {
        Self {
            data: SessionData::new(),
            new: true,
            modified: false,
        }
    }

    /// A session restored from a cookie or a backend.
    pub fn from_data(data: SessionData) -> Self {
        Self {
            data,
            new: false,
            modified: false,
        }
    }

    /// Whether the session was created during this request.
    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Flag the session for saving without touching its contents.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    // ========== Reads ==========

    /// Deserialize the value under `key`. Returns `None` when the key is
    /// absent or holds a value of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn into_data(self) -> SessionData {
        self.data
    }

    // ========== Mutations ==========

    /// Serialize `value` and store it under `key`.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> SessionResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.insert_value(key, value);
        Ok(())
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.modified = true;
        self.data.insert(key.into(), value)
    }

    /// Mutable access to a stored value. Counts as a modification.
    pub fn get_value_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.modified = true;
        self.data.get_mut(key)
    }

    /// Delete `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.modified = true;
        self.data.remove(key)
    }

    /// Remove `key` and deserialize its value.
    pub fn pop<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.remove(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Insert every entry, replacing existing keys.
    pub fn update<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.modified = true;
        self.data
            .extend(entries.into_iter().map(|(key, value)| (key.into(), value)));
    }

    pub fn clear(&mut self) {
        self.modified = true;
        self.data.clear();
    }

    /// Value under `key`, inserting `default` first if the key is absent.
    pub fn set_default(&mut self, key: impl Into<String>, default: Value) -> &mut Value {
        self.modified = true;
        self.data.entry(key.into()).or_insert(default)
    }

    // ========== Flash messages ==========

    /// Queue a flash message under `key` (or [`DEFAULT_FLASH_KEY`]).
    pub fn add_flash<T: Serialize>(
        &mut self,
        value: T,
        level: Option<&str>,
        key: Option<&str>,
    ) -> SessionResult<()> {
        let flash = Flash {
            value: serde_json::to_value(value)
                .map_err(|e| SessionError::Serialization(e.to_string()))?,
            level: level.map(str::to_string),
        };
        let flash =
            serde_json::to_value(flash).map_err(|e| SessionError::Serialization(e.to_string()))?;

        let slot = self.set_default(key.unwrap_or(DEFAULT_FLASH_KEY), Value::Array(Vec::new()));
        match slot {
            Value::Array(list) => list.push(flash),
            other => *other = Value::Array(vec![flash]),
        }
        Ok(())
    }

    /// Take all flash messages under `key` (or [`DEFAULT_FLASH_KEY`]).
    ///
    /// The session is only marked modified when messages were removed.
    /// Entries that are not valid flashes are dropped.
    pub fn get_flashes(&mut self, key: Option<&str>) -> Vec<Flash> {
        let key = key.unwrap_or(DEFAULT_FLASH_KEY);
        if !self.data.contains_key(key) {
            return Vec::new();
        }

        match self.remove(key) {
            Some(Value::Array(list)) => list
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl PartialEq for SessionDict {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl From<SessionData> for SessionDict {
    fn from(data: SessionData) -> Self {
        Self::from_data(data)
    }
}

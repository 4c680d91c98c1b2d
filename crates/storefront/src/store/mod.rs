//! Durable key-value mirror of client-side state.
//!
//! The reconciliation controller keeps the authoritative in-memory cart and
//! writes it here after every successful mutation; the store is read once at
//! startup. Values are JSON documents keyed by the constants in [`keys`].
//!
//! # Implementations
//!
//! - [`FileStore`] - a single JSON file, rewritten atomically on every change
//! - [`MemoryStore`] - process-local, for tests and ephemeral sessions

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Keys under which client-side state is persisted.
pub mod keys {
    /// Cart lines (array of `CartItem`).
    pub const CART_ITEMS: &str = "cart_items";

    /// Cart identifier, possibly carrying the local-cart prefix.
    pub const CART_ID: &str = "cart_id";

    /// Signed-in user summary.
    pub const CURRENT_USER: &str = "current_user";

    /// Wishlist entries.
    pub const WISHLIST: &str = "wishlist";
}

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("Storage serialization error for key '{key}': {source}")]
    Serialization {
        /// Key being read or written.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The backing file is not a JSON object.
    #[error("Storage file is corrupt: {0}")]
    Corrupt(String),

    /// The store's lock was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// One change in a [`LocalStore::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite<'a> {
    /// Set a key to a raw value.
    Set(&'a str, String),
    /// Delete a key.
    Remove(&'a str),
}

impl<'a> StoreWrite<'a> {
    /// Encode `value` as JSON and set it under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if encoding fails.
    pub fn json<T: Serialize + ?Sized>(key: &'a str, value: &T) -> Result<Self, StoreError> {
        serde_json::to_string(value)
            .map(|raw| Self::Set(key, raw))
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })
    }
}

/// Raw string key-value persistence.
pub trait LocalStore: Send + Sync {
    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be read.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written.
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Apply several changes as one unit: either all of them land or none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be written; the
    /// previous contents are then left untouched.
    fn write_batch(&self, writes: Vec<StoreWrite<'_>>) -> Result<(), StoreError>;
}

/// Typed JSON access on top of [`LocalStore`].
pub trait LocalStoreExt: LocalStore {
    /// Read and decode a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the stored value does not decode.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.get_raw(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Serialization {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Encode and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if encoding or writing fails.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, raw)
    }
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {}

impl<S: LocalStore + ?Sized> LocalStore for std::sync::Arc<S> {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn write_batch(&self, writes: Vec<StoreWrite<'_>>) -> Result<(), StoreError> {
        (**self).write_batch(writes)
    }
}

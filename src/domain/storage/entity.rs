//! Keys and entities understood by storage backends

use std::fmt::Debug;
use std::hash::Hash;

use serde::{de::DeserializeOwned, Serialize};

/// A value that uniquely identifies a stored entity
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + Hash {
    /// String form used by backends keyed on text (e.g. a SQL primary key)
    fn as_str(&self) -> &str;
}

/// An entity persisted as a whole document
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    type Key: StorageKey;

    fn key(&self) -> &Self::Key;
}

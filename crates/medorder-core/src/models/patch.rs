//! Partial-update field wrapper.
//!
//! Request bodies for updates distinguish three cases per nullable field:
//! the key is missing (leave the stored value alone), the key is present
//! with `null` (clear the stored value), or the key carries a value
//! (overwrite). `Option<T>` alone cannot express the first two separately.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field in a partial update.
///
/// Use with `#[serde(default)]` so a missing key deserializes to
/// [`Patch::Absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Key not present in the payload.
    Absent,
    /// Key present with an explicit `null`.
    Null,
    /// Key present with a value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// The carried value, if any.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Transform the carried value, keeping absent and null as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    /// Write this patch into a stored optional field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }

    /// Resolve against the currently stored value without consuming it.
    pub fn resolve(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Patch::Absent => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v.clone()),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Null, Patch::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

//! Three-way patch field: absent, null, or a value.
//!
//! Server patches distinguish "key not present" (leave the field alone) from
//! an explicit `null` (the field exists but has no value) and from a value
//! (authoritative replacement). `Option<T>` alone collapses the first two, so
//! patch records use [`Field`] with `#[serde(default)]`: a missing key
//! deserializes to [`Field::Absent`], `null` to [`Field::Null`].

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single patch field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Key not present: unknown, do not touch.
    Absent,
    /// Key present with `null`: clear nullable slots.
    Null,
    /// Key present with a value: replace.
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<T> Field<T> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The carried value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }
}

impl<T: Clone + PartialEq> Field<T> {
    /// Apply to a nullable slot. Returns `true` if the slot changed.
    pub fn apply_nullable(&self, slot: &mut Option<T>) -> bool {
        let next = match self {
            Self::Absent => return false,
            Self::Null => None,
            Self::Value(v) => Some(v.clone()),
        };
        if *slot == next {
            return false;
        }
        *slot = next;
        true
    }

    /// Apply to a slot that always holds a value; `null` is ignored.
    /// Returns `true` if the slot changed.
    pub fn apply(&self, slot: &mut T) -> bool {
        let Self::Value(v) = self else {
            return false;
        };
        if slot == v {
            return false;
        }
        *slot = v.clone();
        true
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(v) => serializer.serialize_some(v),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

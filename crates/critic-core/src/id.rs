//! Stable ID newtypes for review entities.
//!
//! Numeric IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that an `AccountId` cannot be accidentally used where a `ChangeId` is
//! expected. [`ObjectId`] is the 20-byte content address used for change
//! revisions and metadata snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CoreError;

/// Account identifier (`_account_id` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u32);

/// Legacy change number (`_number` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub u32);

/// Legacy numeric group identifier. Kept for lookup only; the stable
/// identity of a group is its [`GroupUuid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Stable identity of an internal group. Survives renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupUuid(pub Uuid);

impl GroupUuid {
    pub fn new_random() -> Self {
        GroupUuid(Uuid::new_v4())
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of an [`ObjectId`] in bytes.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of an [`ObjectId`] rendered as hex.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// A 20-byte content-addressed identifier, rendered as 40 lowercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Parses a 40-character hex string. Either case is accepted.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(CoreError::InvalidObjectId {
                value: s.to_string(),
            });
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| CoreError::InvalidObjectId {
            value: s.to_string(),
        })?;
        Ok(ObjectId(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn object_id_parses_lowercase_hex() {
        let id = ObjectId::parse(SHA).unwrap();
        assert_eq!(id.to_hex(), SHA);
        assert_eq!(id.as_bytes()[0], 0x01);
    }

    #[test]
    fn object_id_accepts_uppercase_and_renders_lowercase() {
        let id = ObjectId::parse(&SHA.to_uppercase()).unwrap();
        assert_eq!(id.to_string(), SHA);
    }

    #[test]
    fn object_id_rejects_short_and_long_input() {
        assert!(ObjectId::parse(&SHA[..39]).is_err());
        assert!(ObjectId::parse(&format!("{SHA}0")).is_err());
        assert!(ObjectId::parse("").is_err());
    }

    #[test]
    fn object_id_rejects_non_hex() {
        let bad = format!("{}g", &SHA[..39]);
        assert_eq!(
            ObjectId::parse(&bad),
            Err(CoreError::InvalidObjectId { value: bad.clone() })
        );
    }

    #[test]
    fn object_id_serializes_as_hex_string() {
        let id = ObjectId::parse(SHA).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SHA}\""));
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn account_id_display() {
        assert_eq!(format!("{}", AccountId(1000)), "1000");
    }

    #[test]
    fn group_uuids_are_unique() {
        assert_ne!(GroupUuid::new_random(), GroupUuid::new_random());
    }

    proptest! {
        #[test]
        fn any_forty_hex_chars_are_accepted(s in "[0-9a-fA-F]{40}") {
            let id = ObjectId::parse(&s);
            prop_assert!(id.is_ok());
            prop_assert_eq!(id.unwrap().to_hex(), s.to_lowercase());
        }

        #[test]
        fn other_lengths_are_rejected(s in "[0-9a-f]{0,80}") {
            prop_assume!(s.len() != OBJECT_ID_HEX_LEN);
            prop_assert!(ObjectId::parse(&s).is_err());
        }

        #[test]
        fn non_hex_characters_are_rejected(
            prefix in "[0-9a-f]{0,39}",
            bad in "[g-zG-Z_ ~-]",
        ) {
            let mut s = prefix;
            s.push_str(&bad);
            while s.len() < OBJECT_ID_HEX_LEN {
                s.push('0');
            }
            prop_assert!(ObjectId::parse(&s).is_err());
        }
    }
}

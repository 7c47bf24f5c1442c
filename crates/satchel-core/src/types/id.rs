//! Newtype wrappers around [`uuid::Uuid`] for every identifier the
//! reconciliation engine passes around.
//!
//! Distinct types keep a `ContentNodeId` from being handed to a query that
//! expects a `ChannelId`. With the `sqlx` feature each ID type also
//! implements `sqlx::Type`, `sqlx::Encode`, and `sqlx::Decode` for
//! PostgreSQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Render as 32 lowercase hex digits without dashes.
            pub fn simple(&self) -> String {
                self.0.simple().to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <Uuid as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> sqlx::postgres::PgTypeInfo {
                <Uuid as sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a content request row.
    RequestId
);

define_id!(
    /// Identifier of a facility that owns requests.
    FacilityId
);

define_id!(
    /// Identifier of a sync dataset (one per facility).
    DatasetId
);

define_id!(
    /// Identifier of a node in the content tree.
    ContentNodeId
);

define_id!(
    /// Identifier of a content channel.
    ChannelId
);

define_id!(
    /// Identifier of a device instance on the network.
    InstanceId
);

define_id!(
    /// Identifier of a network location registry entry.
    LocationId
);

define_id!(
    /// Identifier of a sync session between two instances.
    SyncSessionId
);

define_id!(
    /// Identifier of a single transfer within a sync session.
    TransferSessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_is_simple_hex() {
        let uuid = Uuid::new_v4();
        let id = ContentNodeId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.simple().to_string());
        assert_eq!(id.to_string().len(), 32);
    }

    #[test]
    fn test_from_str_accepts_both_forms() {
        let uuid = Uuid::new_v4();
        let hyphenated: InstanceId = uuid.to_string().parse().expect("should parse");
        let simple: InstanceId = uuid.simple().to_string().parse().expect("should parse");
        assert_eq!(hyphenated, simple);
        assert_eq!(hyphenated.0, uuid);
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = ChannelId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: ChannelId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}

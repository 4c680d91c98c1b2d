//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. The cart API issues
//! opaque string identifiers, so every ID wraps a non-empty `String`.
//!
//! Cart identity is split in two: [`CartId`] is issued by the remote cart API,
//! [`LocalCartId`] is minted on this device while the remote is unreachable.
//! [`CartRef`] carries either one, and is the only place where the persisted
//! string form (with its `local_` prefix) is interpreted.

use core::fmt;

use chrono::Utc;
use uuid::Uuid;

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty or whitespace.
    #[error("identifier cannot be empty")]
    Empty,
    /// A local cart identifier is missing its prefix or token.
    #[error("invalid local cart identifier: {0}")]
    InvalidLocal(String),
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a plain string, rejecting empty values
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()`, `as_str()`, `into_inner()`
/// - `Display`, `FromStr` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use storefront_cart_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(ShipmentId);
///
/// let warehouse = WarehouseId::parse("wh-1").unwrap();
/// let shipment = ShipmentId::parse("wh-1").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = shipment;
/// assert_eq!(warehouse.as_str(), shipment.as_str());
/// assert!(WarehouseId::parse("  ").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns `IdError::Empty` if the trimmed input is empty.
            pub fn parse(id: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err($crate::IdError::Empty);
                }
                Ok(Self(id))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(id: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(VariantId);
define_id!(CartId);
define_id!(LineItemId);
define_id!(CustomerId);

/// A cart identifier minted on this device.
///
/// Never sent to the remote cart API. The string form is
/// `local_<unix millis>_<random>` so that persisted values stay
/// distinguishable from server-issued IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalCartId(String);

impl LocalCartId {
    /// Prefix marking a persisted cart identifier as local-only.
    pub const PREFIX: &'static str = "local_";

    /// Mint a fresh local identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}{}_{}",
            Self::PREFIX,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    /// Parse a persisted local identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidLocal` if the prefix or token is missing.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        match s.strip_prefix(Self::PREFIX) {
            Some(token) if !token.trim().is_empty() => Ok(Self(s.to_string())),
            _ => Err(IdError::InvalidLocal(s.to_string())),
        }
    }

    /// Get the full identifier, prefix included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalCartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the cart currently in use: either server-issued or local.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartRef {
    /// Cart exists only on this device.
    Local(LocalCartId),
    /// Cart is owned by the remote cart API.
    Remote(CartId),
}

impl CartRef {
    /// Interpret a persisted identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the value is empty or a malformed local ID.
    pub fn from_persisted(s: &str) -> Result<Self, IdError> {
        if s.starts_with(LocalCartId::PREFIX) {
            LocalCartId::parse(s).map(Self::Local)
        } else {
            CartId::parse(s).map(Self::Remote)
        }
    }

    /// String form used in the local store.
    #[must_use]
    pub fn to_persisted(&self) -> String {
        match self {
            Self::Local(id) => id.as_str().to_string(),
            Self::Remote(id) => id.as_str().to_string(),
        }
    }

    /// The server-issued ID, if any.
    #[must_use]
    pub const fn remote(&self) -> Option<&CartId> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Local(_) => None,
        }
    }

    /// Whether this cart is known to the remote API.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for CartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => id.fmt(f),
            Self::Remote(id) => id.fmt(f),
        }
    }
}

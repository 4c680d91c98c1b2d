//! Signed-in user summary.
//!
//! The summary is persisted so a restarted client remembers who is signed
//! in. Only the front end reads it; the cart controller receives the
//! customer ID explicitly through [`CartController::new`] and
//! [`CartController::set_customer`].
//!
//! [`CartController::new`]: crate::cart::CartController::new
//! [`CartController::set_customer`]: crate::cart::CartController::set_customer

use serde::{Deserialize, Serialize};

use storefront_cart_core::CustomerId;

use crate::store::{LocalStore, LocalStoreExt, StoreError, keys};

/// Minimal identity of the signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Customer ID at the cart API.
    pub id: CustomerId,
    /// Name shown in the UI.
    pub display_name: String,
}

/// Load the signed-in user, if any.
///
/// A stored value that no longer decodes is treated as signed out.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be read.
pub fn current_user(store: &impl LocalStore) -> Result<Option<SessionUser>, StoreError> {
    match store.get_json::<SessionUser>(keys::CURRENT_USER) {
        Ok(user) => Ok(user),
        Err(StoreError::Serialization { .. }) => {
            tracing::warn!("Discarding unreadable session user");
            store.remove(keys::CURRENT_USER)?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Persist the signed-in user.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be written.
pub fn sign_in(store: &impl LocalStore, user: &SessionUser) -> Result<(), StoreError> {
    store.set_json(keys::CURRENT_USER, user)
}

/// Forget the signed-in user.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be written.
pub fn sign_out(store: &impl LocalStore) -> Result<(), StoreError> {
    store.remove(keys::CURRENT_USER)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_sign_in_and_out() {
        let store = MemoryStore::new();
        assert!(current_user(&store).unwrap().is_none());

        let user = SessionUser {
            id: CustomerId::parse("cust-1").unwrap(),
            display_name: "Ada".to_string(),
        };
        sign_in(&store, &user).unwrap();
        assert_eq!(current_user(&store).unwrap(), Some(user));

        sign_out(&store).unwrap();
        assert!(current_user(&store).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_user_is_signed_out() {
        let store = MemoryStore::new();
        store
            .set_raw(keys::CURRENT_USER, r#"{"id":""}"#.to_string())
            .unwrap();

        assert!(current_user(&store).unwrap().is_none());
        assert!(store.get_raw(keys::CURRENT_USER).unwrap().is_none());
    }
}

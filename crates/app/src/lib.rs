//! Ops wiring for the `shopledger` binary.

use chrono::Utc;
use tracing::info;

use shopledger_auth::{Identity, NewUser, Role, UserProfile, normalize_email};
use shopledger_core::{DomainResult, UserId};
use shopledger_infra::{BootstrapAdmin, LedgerStore};

/// Create the configured ADMIN account unless a user with that email exists.
///
/// Returns the new profile, or `None` when nothing was created.
pub async fn bootstrap_admin(
    store: &dyn LedgerStore,
    admin: &BootstrapAdmin,
) -> DomainResult<Option<UserProfile>> {
    let email = normalize_email(&admin.email);
    if store.get_user_by_email(&email).await?.is_some() {
        info!(%email, "bootstrap admin already present");
        return Ok(None);
    }

    let user = NewUser {
        email,
        password: admin.password.clone(),
        name: Some("Administrator".to_string()),
        role: Some(Role::Admin),
    }
    .into_user(Utc::now())?;
    let user = store.insert_user(user).await?;

    info!(user_id = %user.id, email = %user.email, "bootstrap admin created");
    Ok(Some(user.profile()))
}

/// Read-only identity the binary uses for its own dashboard queries.
pub fn ops_identity() -> Identity {
    Identity::new(UserId::new(), Role::Viewer)
}

#[cfg(test)]
mod tests {
    use super::*;

    use shopledger_infra::ledger_store::InMemoryLedgerStore;

    fn admin() -> BootstrapAdmin {
        BootstrapAdmin {
            email: " Admin@School.local ".to_string(),
            password: "admin123".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let store = InMemoryLedgerStore::new();

        let created = bootstrap_admin(&store, &admin()).await.unwrap().unwrap();
        assert_eq!(created.email, "admin@school.local");
        assert_eq!(created.role, Role::Admin);

        assert!(bootstrap_admin(&store, &admin()).await.unwrap().is_none());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let weak = BootstrapAdmin {
            password: "123".to_string(),
            ..admin()
        };
        assert!(bootstrap_admin(&store, &weak).await.is_err());
        assert!(store.list_users().await.unwrap().is_empty());
    }
}

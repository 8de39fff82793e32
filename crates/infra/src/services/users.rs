//! User management and sign-in.

use chrono::Utc;
use tracing::{info, instrument, warn};

use shopledger_auth::{
    Identity, NewUser, Role, Session, User, UserProfile, UserUpdate, normalize_email,
    require_role, verify_password,
};
use shopledger_core::{DomainError, DomainResult, UserId};

use crate::ledger_store::SharedLedgerStore;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const SESSION_INVALID: &str = "Session invalid";

#[derive(Clone)]
pub struct UserDirectory {
    store: SharedLedgerStore,
}

impl UserDirectory {
    pub fn new(store: SharedLedgerStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: UserId) -> DomainResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify credentials and open a session.
    ///
    /// Unknown email, inactive account and wrong password all fail the same way.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<Session> {
        let email = normalize_email(email);
        let user = match self.store.get_user_by_email(&email).await? {
            Some(user) if user.is_active && verify_password(password, &user.password_hash) => user,
            _ => {
                warn!(%email, "login failed");
                return Err(DomainError::unauthenticated(INVALID_CREDENTIALS));
            }
        };

        info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(Session {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        })
    }

    /// Re-read the session's user so role changes and deactivation apply immediately.
    pub async fn current_identity(&self, session: &Session) -> DomainResult<Identity> {
        match self.store.get_user(session.user_id).await? {
            Some(user) if user.is_active => Ok(Identity::new(user.id, user.role)),
            _ => Err(DomainError::unauthenticated(SESSION_INVALID)),
        }
    }

    /// Sessions are plain values; ending one means dropping it.
    pub fn logout(&self, session: Session) {
        info!(user_id = %session.user_id, "logout");
    }

    /// All roles, highest first.
    pub fn roles(&self) -> &'static [Role] {
        &Role::ALL
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administration (ADMIN only)
    // ─────────────────────────────────────────────────────────────────────────

    /// Users, newest first.
    pub async fn list_users(&self, identity: &Identity) -> DomainResult<Vec<UserProfile>> {
        require_role(identity, &[Role::Admin])?;
        Ok(self
            .store
            .list_users()
            .await?
            .iter()
            .map(User::profile)
            .collect())
    }

    #[instrument(skip(self, identity, request), fields(user_id = %identity.user_id), err)]
    pub async fn create_user(
        &self,
        identity: &Identity,
        request: NewUser,
    ) -> DomainResult<UserProfile> {
        require_role(identity, &[Role::Admin])?;
        let user = self.store.insert_user(request.into_user(Utc::now())?).await?;

        info!(created = %user.id, role = %user.role, "user created");
        Ok(user.profile())
    }

    #[instrument(skip(self, identity, update), fields(user_id = %identity.user_id), err)]
    pub async fn update_user(
        &self,
        identity: &Identity,
        id: UserId,
        update: UserUpdate,
    ) -> DomainResult<UserProfile> {
        require_role(identity, &[Role::Admin])?;
        let mut user = self.load(id).await?;
        update.apply_to(&mut user)?;
        let user = self.store.update_user(user).await?;

        info!(updated = %user.id, role = %user.role, active = user.is_active, "user updated");
        Ok(user.profile())
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id), err)]
    pub async fn delete_user(&self, identity: &Identity, id: UserId) -> DomainResult<()> {
        require_role(identity, &[Role::Admin])?;
        if id == identity.user_id {
            return Err(DomainError::validation("Cannot delete your own account"));
        }
        self.store.delete_user(id).await?;

        info!(deleted = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use shopledger_core::ErrorKind;

    use crate::ledger_store::{InMemoryLedgerStore, LedgerStore};

    async fn seeded() -> (UserDirectory, Identity) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let admin = NewUser {
            email: "admin@school.local".to_string(),
            password: "admin123".to_string(),
            name: Some("Administrator".to_string()),
            role: Some(Role::Admin),
        }
        .into_user(Utc::now())
        .unwrap();
        let admin = store.insert_user(admin).await.unwrap();
        (UserDirectory::new(store), Identity::new(admin.id, admin.role))
    }

    fn new_staff(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "staff123".to_string(),
            name: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn login_normalizes_email_and_checks_password() {
        let (users, admin) = seeded().await;

        let session = users.login(" ADMIN@school.local ", "admin123").await.unwrap();
        assert_eq!(session.user_id, admin.user_id);
        assert_eq!(session.identity(), admin);

        let err = users.login("admin@school.local", "wrong").await.unwrap_err();
        assert_eq!(err, DomainError::unauthenticated(INVALID_CREDENTIALS));
        let err = users.login("nobody@school.local", "admin123").await.unwrap_err();
        assert_eq!(err, DomainError::unauthenticated(INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn deactivated_users_lose_login_and_session() {
        let (users, admin) = seeded().await;
        let staff = users
            .create_user(&admin, new_staff("staff@school.local"))
            .await
            .unwrap();
        assert_eq!(staff.role, Role::Staff);

        let session = users.login("staff@school.local", "staff123").await.unwrap();
        assert_eq!(
            users.current_identity(&session).await.unwrap().role,
            Role::Staff
        );

        users
            .update_user(
                &admin,
                staff.id,
                UserUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            users.current_identity(&session).await.unwrap_err(),
            DomainError::unauthenticated(SESSION_INVALID)
        );
        assert_eq!(
            users.login("staff@school.local", "staff123").await.unwrap_err().kind(),
            ErrorKind::Unauthenticated
        );
        users.logout(session);
    }

    #[tokio::test]
    async fn administration_is_admin_only() {
        let (users, admin) = seeded().await;
        let manager = Identity::new(UserId::new(), Role::Manager);

        let err = users.list_users(&manager).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = users.delete_user(&admin, admin.user_id).await.unwrap_err();
        assert_eq!(err, DomainError::validation("Cannot delete your own account"));

        users
            .create_user(&admin, new_staff("staff@school.local"))
            .await
            .unwrap();
        let dup = users
            .create_user(&admin, new_staff("Staff@School.local"))
            .await
            .unwrap_err();
        assert_eq!(dup, DomainError::conflict("Email already registered"));

        assert_eq!(users.list_users(&admin).await.unwrap().len(), 2);
        assert_eq!(users.roles().first(), Some(&Role::Admin));
    }
}

//! School settings shown in the app shell.

use serde::Serialize;
use tracing::{info, instrument};

use shopledger_auth::{Identity, Role, require_role};
use shopledger_core::{DomainError, DomainResult};

use crate::ledger_store::SharedLedgerStore;

/// Name shown until an ADMIN sets one.
pub const DEFAULT_SCHOOL_NAME: &str = "By The Numb3rs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolSettings {
    pub school_name: String,
}

#[derive(Clone)]
pub struct SettingsService {
    store: SharedLedgerStore,
}

impl SettingsService {
    pub fn new(store: SharedLedgerStore) -> Self {
        Self { store }
    }

    /// Readable without an identity; the login page needs it.
    pub async fn school_settings(&self) -> DomainResult<SchoolSettings> {
        let school_name = self
            .store
            .get_school_name()
            .await?
            .unwrap_or_else(|| DEFAULT_SCHOOL_NAME.to_string());
        Ok(SchoolSettings { school_name })
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id), err)]
    pub async fn update_school_name(
        &self,
        identity: &Identity,
        school_name: &str,
    ) -> DomainResult<SchoolSettings> {
        require_role(identity, &[Role::Admin])?;
        let name = school_name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("schoolName is required"));
        }
        let school_name = self.store.set_school_name(name.to_string()).await?;

        info!(%school_name, "school name updated");
        Ok(SchoolSettings { school_name })
    }
}

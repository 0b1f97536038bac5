use std::sync::Arc;

use crate::models::{Identity, Role};
use crate::services::{AuthStore, ServiceError};

/// Collection an identity was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Admin,
    Manager,
    Employee,
}

/// Partitions are searched in this order and the first hit wins, so an
/// address present in more than one partition resolves to the most
/// privileged record.
pub const LOOKUP_ORDER: [Partition; 3] = [Partition::Admin, Partition::Manager, Partition::Employee];

impl Partition {
    pub fn role(&self) -> Role {
        match self {
            Partition::Admin => Role::Admin,
            Partition::Manager => Role::Manager,
            Partition::Employee => Role::Employee,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub identity: Identity,
    pub partition: Partition,
}

impl DirectoryEntry {
    /// User type recorded on sessions created for this entry.
    pub fn user_type(&self) -> Role {
        self.partition.role()
    }
}

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn AuthStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Resolve an email address to its owning identity.
    pub async fn lookup(&self, email: &str) -> Result<Option<DirectoryEntry>, ServiceError> {
        let email = email.trim().to_lowercase();

        for partition in LOOKUP_ORDER {
            let identity = match partition {
                Partition::Admin => self
                    .store
                    .find_admin_by_email(&email)
                    .await?
                    .map(Identity::Admin),
                Partition::Manager | Partition::Employee => self
                    .store
                    .find_company_user_by_email(&email, partition.role())
                    .await?
                    .map(Identity::CompanyUser),
            };

            if let Some(identity) = identity {
                return Ok(Some(DirectoryEntry {
                    identity,
                    partition,
                }));
            }
        }

        Ok(None)
    }

    /// Any identity other than `except_user_id` that already owns `email`.
    pub async fn find_other_owner(
        &self,
        email: &str,
        except_user_id: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        let email = email.trim().to_lowercase();

        if let Some(admin) = self.store.find_admin_by_email(&email).await? {
            if admin.id != except_user_id {
                return Ok(Some(Identity::Admin(admin)));
            }
        }

        Ok(self
            .store
            .find_company_users_by_email(&email)
            .await?
            .into_iter()
            .find(|u| u.id != except_user_id)
            .map(Identity::CompanyUser))
    }
}

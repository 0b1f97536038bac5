//! MongoDB-backed [`AuthStore`], one collection per entity type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};

use super::AuthStore;
use crate::models::{
    AdminRecord, Company, CompanyUser, Invitation, InvitationState, MagicLink, Role, Session,
    UserInvitationStatus,
};
use crate::services::ServiceError;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

fn date_bson(value: &DateTime<Utc>) -> Result<Bson, ServiceError> {
    to_bson(value).map_err(|e| ServiceError::Internal(anyhow::anyhow!("bson encode: {}", e)))
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ServiceError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to MongoDB");
            ServiceError::Database(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), ServiceError> {
        tracing::info!("Creating MongoDB indexes for workforce-auth");

        let unique_token = || {
            IndexModel::builder()
                .keys(doc! { "token": 1 })
                .options(
                    IndexOptions::builder()
                        .name("token_unique_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build()
        };

        self.sessions().create_index(unique_token(), None).await?;
        self.magic_links().create_index(unique_token(), None).await?;
        self.invitations().create_index(unique_token(), None).await?;

        let pending_by_employee = IndexModel::builder()
            .keys(doc! { "employee_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("employee_status_idx".to_string())
                    .build(),
            )
            .build();
        self.invitations()
            .create_index(pending_by_employee, None)
            .await?;

        let email_index = |name: &str| {
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };
        self.admins()
            .create_index(email_index("admin_email_idx"), None)
            .await?;
        self.company_users()
            .create_index(email_index("company_user_email_idx"), None)
            .await?;

        let company_index = IndexModel::builder()
            .keys(doc! { "company_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("company_user_company_idx".to_string())
                    .build(),
            )
            .build();
        self.company_users()
            .create_index(company_index, None)
            .await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn sessions(&self) -> Collection<Session> {
        self.db.collection("sessions")
    }

    pub fn magic_links(&self) -> Collection<MagicLink> {
        self.db.collection("magic_links")
    }

    pub fn invitations(&self) -> Collection<Invitation> {
        self.db.collection("invitations")
    }

    pub fn admins(&self) -> Collection<AdminRecord> {
        self.db.collection("admins")
    }

    pub fn company_users(&self) -> Collection<CompanyUser> {
        self.db.collection("company_users")
    }

    pub fn companies(&self) -> Collection<Company> {
        self.db.collection("companies")
    }

    async fn set_one<T: Send + Sync>(
        collection: Collection<T>,
        filter: Document,
        set: Document,
    ) -> Result<bool, ServiceError> {
        let result = collection
            .update_one(filter, doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl AuthStore for MongoStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "MongoDB health check failed");
                ServiceError::Database(e)
            })?;
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), ServiceError> {
        self.sessions().insert_one(session, None).await?;
        Ok(())
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, ServiceError> {
        Ok(self
            .sessions()
            .find_one(doc! { "token": token }, None)
            .await?)
    }

    async fn touch_session(
        &self,
        session_id: &str,
        last_used_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        Self::set_one(
            self.sessions(),
            doc! { "_id": session_id },
            doc! { "last_used_at": date_bson(&last_used_at)? },
        )
        .await?;
        Ok(())
    }

    async fn insert_magic_link(&self, link: &MagicLink) -> Result<(), ServiceError> {
        self.magic_links().insert_one(link, None).await?;
        Ok(())
    }

    async fn find_magic_link_by_token(
        &self,
        token: &str,
    ) -> Result<Option<MagicLink>, ServiceError> {
        Ok(self
            .magic_links()
            .find_one(doc! { "token": token }, None)
            .await?)
    }

    async fn consume_magic_link(
        &self,
        link_id: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        Self::set_one(
            self.magic_links(),
            doc! { "_id": link_id, "used_at": Bson::Null },
            doc! { "used_at": date_bson(&used_at)? },
        )
        .await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), ServiceError> {
        self.invitations().insert_one(invitation, None).await?;
        Ok(())
    }

    async fn find_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Invitation>, ServiceError> {
        Ok(self
            .invitations()
            .find_one(doc! { "token": token }, None)
            .await?)
    }

    async fn find_invitations_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<Invitation>, ServiceError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .invitations()
            .find(doc! { "employee_id": employee_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn revoke_pending_invitations(&self, employee_id: &str) -> Result<u64, ServiceError> {
        let result = self
            .invitations()
            .update_many(
                doc! {
                    "employee_id": employee_id,
                    "status": InvitationState::Pending.as_str(),
                },
                doc! { "$set": { "status": InvitationState::Revoked.as_str() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn transition_invitation(
        &self,
        invitation_id: &str,
        to: InvitationState,
    ) -> Result<bool, ServiceError> {
        Self::set_one(
            self.invitations(),
            doc! { "_id": invitation_id, "status": InvitationState::Pending.as_str() },
            doc! { "status": to.as_str() },
        )
        .await
    }

    async fn mark_invitation_accepted(
        &self,
        invitation_id: &str,
        accepted_email: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        Self::set_one(
            self.invitations(),
            doc! { "_id": invitation_id, "status": InvitationState::Pending.as_str() },
            doc! {
                "status": InvitationState::Accepted.as_str(),
                "accepted_email": accepted_email,
                "accepted_at": date_bson(&accepted_at)?,
            },
        )
        .await
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>, ServiceError> {
        Ok(self.admins().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_company_user_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<CompanyUser>, ServiceError> {
        Ok(self
            .company_users()
            .find_one(doc! { "email": email, "role": role.as_str() }, None)
            .await?)
    }

    async fn find_company_users_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CompanyUser>, ServiceError> {
        let cursor = self
            .company_users()
            .find(doc! { "email": email }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_company_user_by_id(&self, id: &str) -> Result<Option<CompanyUser>, ServiceError> {
        Ok(self
            .company_users()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn insert_company_user(&self, user: &CompanyUser) -> Result<(), ServiceError> {
        self.company_users().insert_one(user, None).await?;
        Ok(())
    }

    async fn list_company_users(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyUser>, ServiceError> {
        let options = FindOptions::builder()
            .sort(doc! { "last_name": 1, "first_name": 1 })
            .build();
        let cursor = self
            .company_users()
            .find(doc! { "company_id": company_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_company_user_invitation_status(
        &self,
        user_id: &str,
        status: UserInvitationStatus,
    ) -> Result<(), ServiceError> {
        Self::set_one(
            self.company_users(),
            doc! { "_id": user_id },
            doc! {
                "invitation_status": status.as_str(),
                "updated_at": date_bson(&Utc::now())?,
            },
        )
        .await?;
        Ok(())
    }

    async fn bind_company_user_email(
        &self,
        user_id: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        Self::set_one(
            self.company_users(),
            doc! { "_id": user_id },
            doc! {
                "email": email,
                "invitation_status": UserInvitationStatus::Accepted.as_str(),
                "updated_at": date_bson(&at)?,
            },
        )
        .await?;
        Ok(())
    }

    async fn find_company_by_id(&self, id: &str) -> Result<Option<Company>, ServiceError> {
        Ok(self.companies().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, ServiceError> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.companies().find(doc! {}, options).await?;
        Ok(cursor.try_collect().await?)
    }
}

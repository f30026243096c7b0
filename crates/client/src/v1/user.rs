use nabii_primitives::common::{PaginateOptions, Paginated};
use nabii_primitives::user::{
    AdminCreateUserForm, AdminUpdateUserForm, AdminUser, BulkCreateResult, EmailSentResult, Role,
    UpdateMeForm, User,
};
use serde_json::{json, Value};

use crate::connection::encode_segment;
use crate::errors::NabiiError;
use crate::guard::Guard;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct UserV1 {
    session: Session,
    pub admin: AdminUserV1,
}

impl UserV1 {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            admin: AdminUserV1::new(session.clone()),
            session,
        }
    }

    #[must_use]
    pub const fn roles(&self) -> [Role; 4] {
        [Role::Banned, Role::User, Role::Supervisor, Role::Admin]
    }

    pub async fn email_is_available(&self, email: &str) -> Result<bool, NabiiError> {
        self.session
            .get(&format!("/user/check-email/{}", encode_segment(email)))
            .await
    }

    pub async fn update_me(&self, form: &UpdateMeForm) -> Result<User, NabiiError> {
        self.session
            .guarded(Guard::application(), || self.session.patch("/user", form))
            .await
    }

    /// Deletes the account, then closes the local session without waiting
    /// for a logout round trip.
    pub async fn delete_me(&self) -> Result<(), NabiiError> {
        let _deleted: Value = self
            .session
            .guarded(Guard::application(), || self.session.delete("/user"))
            .await?;
        self.session.close_deleted_account().await
    }

    pub async fn check_password(&self, password: &str) -> Result<bool, NabiiError> {
        let path = format!("/user/check-password/{}", encode_segment(password));
        self.session
            .guarded(Guard::NONE.login().refresh(), || self.session.get(&path))
            .await
    }

    pub async fn change_email(&self, email: &str) -> Result<EmailSentResult, NabiiError> {
        let body = json!({ "email": email });
        self.session
            .guarded(Guard::NONE.login().refresh(), || {
                self.session.patch("/user/email", &body)
            })
            .await
    }
}

/// User administration. Reached through [`UserV1::admin`].
#[derive(Clone, Debug)]
pub struct AdminUserV1 {
    session: Session,
}

impl AdminUserV1 {
    pub(crate) const fn new(session: Session) -> Self {
        Self { session }
    }

    async fn list(
        &self,
        path: &str,
        options: &PaginateOptions,
    ) -> Result<Paginated<AdminUser>, NabiiError> {
        self.session
            .guarded(Guard::application(), || {
                self.session.get_query(path, options)
            })
            .await
    }

    /// Accounts waiting for activation.
    pub async fn get_all_pending(
        &self,
        options: &PaginateOptions,
    ) -> Result<Paginated<AdminUser>, NabiiError> {
        self.list("/admin/user/pending", options).await
    }

    pub async fn get_all(
        &self,
        options: &PaginateOptions,
    ) -> Result<Paginated<AdminUser>, NabiiError> {
        self.list("/admin/user", options).await
    }

    pub async fn get_all_admins(
        &self,
        options: &PaginateOptions,
    ) -> Result<Paginated<AdminUser>, NabiiError> {
        self.list("/admin/user/admin", options).await
    }

    pub async fn get_by_pk(&self, pk: u64) -> Result<Option<AdminUser>, NabiiError> {
        let path = format!("/admin/user/{pk}");
        self.session
            .guarded(Guard::application(), || self.session.get(&path))
            .await
    }

    pub async fn create(&self, form: &AdminCreateUserForm) -> Result<AdminUser, NabiiError> {
        self.session
            .guarded(Guard::application(), || {
                self.session.post("/admin/user", form)
            })
            .await
    }

    pub async fn update(
        &self,
        pk: u64,
        form: &AdminUpdateUserForm,
    ) -> Result<AdminUser, NabiiError> {
        let path = format!("/admin/user/{pk}");
        self.session
            .guarded(Guard::application(), || self.session.patch(&path, form))
            .await
    }

    pub async fn delete(&self, pk: u64) -> Result<(), NabiiError> {
        let path = format!("/admin/user/{pk}");
        let _deleted: Value = self
            .session
            .guarded(Guard::application(), || self.session.delete(&path))
            .await?;
        Ok(())
    }

    pub async fn update_role(&self, pk: u64, role: Role) -> Result<AdminUser, NabiiError> {
        let path = format!("/admin/user/{pk}/role");
        let body = json!({ "role": role });
        self.session
            .guarded(Guard::application(), || self.session.patch(&path, &body))
            .await
    }

    /// Every user as a CSV document.
    pub async fn export(&self) -> Result<String, NabiiError> {
        self.session
            .guarded(Guard::application(), || {
                self.session.get_text("/admin/user/export")
            })
            .await
    }

    pub async fn import(
        &self,
        users: &[AdminCreateUserForm],
    ) -> Result<BulkCreateResult, NabiiError> {
        let body = json!({ "users": users });
        self.session
            .guarded(Guard::application(), || {
                self.session.post("/admin/user/import", &body)
            })
            .await
    }
}

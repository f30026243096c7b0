use nabii_primitives::auth::{CheckTokenResponse, EmailSubject, StrategyName};
use nabii_primitives::common::Platform;
use nabii_primitives::credentials::{Credentials, PartialCredentials, RefreshTokenResult};
use nabii_primitives::user::{CreateUserForm, EmailSentResult, User, UserUpdatedResult};
use serde_json::json;

use crate::errors::NabiiError;
use crate::guard::Guard;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct AuthV1 {
    session: Session,
}

impl AuthV1 {
    pub(crate) const fn new(session: Session) -> Self {
        Self { session }
    }

    /// URL to open for an OAuth sign-in with `name`.
    #[must_use]
    pub fn strategy(&self, name: StrategyName) -> String {
        format!("{}/auth/{}", self.session.url(), name.as_str())
    }

    pub async fn register(&self, form: &CreateUserForm) -> Result<User, NabiiError> {
        self.session.post("/user", form).await
    }

    /// Sends the activation email again.
    pub async fn callback_activate_account(
        &self,
        email: &str,
    ) -> Result<EmailSentResult, NabiiError> {
        self.session
            .post("/auth/activate-account/callback", &json!({ "email": email }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, NabiiError> {
        self.session.login(email, password).await
    }

    pub async fn set_credentials(
        &self,
        credentials: PartialCredentials,
    ) -> Result<RefreshTokenResult, NabiiError> {
        self.session.set_credentials(credentials).await
    }

    #[must_use]
    pub fn get_credentials(&self) -> Option<Credentials> {
        self.session.credentials()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in() && self.session.platform() == Platform::Application
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    pub async fn me(&self) -> Result<User, NabiiError> {
        self.session
            .guarded(Guard::application(), || self.session.get("/auth/me"))
            .await
    }

    pub async fn logout(&self) -> Result<(), NabiiError> {
        self.session.logout().await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<EmailSentResult, NabiiError> {
        self.session
            .post("/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    pub async fn check_token_validity(
        &self,
        token: &str,
        subject: EmailSubject,
    ) -> Result<CheckTokenResponse, NabiiError> {
        self.session
            .get_query(
                "/auth/check-token",
                &[("token", token), ("subject", subject.as_str())],
            )
            .await
    }

    pub async fn activate_account(&self, token: &str) -> Result<UserUpdatedResult, NabiiError> {
        self.session
            .patch("/auth/activate-account", &json!({ "token": token }))
            .await
    }

    pub async fn set_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<UserUpdatedResult, NabiiError> {
        self.session
            .patch(
                "/auth/set-password",
                &json!({ "token": token, "password": password }),
            )
            .await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<UserUpdatedResult, NabiiError> {
        self.session
            .patch(
                "/auth/reset-password",
                &json!({ "token": token, "password": new_password }),
            )
            .await
    }
}

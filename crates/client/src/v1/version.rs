use nabii_primitives::common::{PaginateOptions, Paginated};
use nabii_primitives::version::{AdminVersion, CheckVersionResult, CreateVersionForm, VersionType};

use crate::connection::encode_segment;
use crate::errors::NabiiError;
use crate::guard::Guard;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct VersionV1 {
    session: Session,
    pub admin: AdminVersionV1,
}

impl VersionV1 {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            admin: AdminVersionV1::new(session.clone()),
            session,
        }
    }

    #[must_use]
    pub const fn types(&self) -> [VersionType; 3] {
        VersionType::ALL
    }

    /// Compares `name` with the latest published version.
    pub async fn check(&self, name: &str) -> Result<CheckVersionResult, NabiiError> {
        let path = format!("/version/check/{}", encode_segment(name));
        self.session
            .guarded(Guard::application(), || self.session.get(&path))
            .await
    }
}

#[derive(Clone, Debug)]
pub struct AdminVersionV1 {
    session: Session,
}

impl AdminVersionV1 {
    pub(crate) const fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn get_all(
        &self,
        options: &PaginateOptions,
    ) -> Result<Paginated<AdminVersion>, NabiiError> {
        self.session
            .guarded(Guard::application(), || {
                self.session.get_query("/admin/version", options)
            })
            .await
    }

    pub async fn get_by_pk(&self, pk: u64) -> Result<Option<AdminVersion>, NabiiError> {
        let path = format!("/admin/version/{pk}");
        self.session
            .guarded(Guard::application(), || self.session.get(&path))
            .await
    }

    pub async fn create(&self, form: &CreateVersionForm) -> Result<AdminVersion, NabiiError> {
        self.session
            .guarded(Guard::application(), || {
                self.session.post("/admin/version", form)
            })
            .await
    }
}

//! Handler for permission grants.
//!
//! Grants cannot be updated; every configured field forces replacement.

use async_trait::async_trait;
use tracing::info;

use crate::api::TurbotApi;
use crate::error::Result;
use crate::helpers::map_from_resource_data;
use crate::schema::ResourceData;

use super::{ResourceHandler, ResourceKind, clear_if_not_found, store_akas};

/// Fields passed through to the create mutation.
const GRANT_INPUT_PROPERTIES: &[&str] = &["identity", "type", "level", "resource"];

/// Reference field and the computed akas field it resolves into.
const AKA_FIELDS: &[(&str, &str)] = &[
    ("resource", "resource_akas"),
    ("identity", "identity_akas"),
    ("type", "permission_type_akas"),
    ("level", "permission_level_akas"),
];

/// Handler for `grant` resources.
pub struct GrantHandler<'a> {
    client: &'a dyn TurbotApi,
}

impl<'a> GrantHandler<'a> {
    /// Creates a grant handler.
    #[must_use]
    pub const fn new(client: &'a dyn TurbotApi) -> Self {
        Self { client }
    }

    async fn store_all_akas(&self, data: &mut ResourceData) -> Result<()> {
        for (reference_field, akas_field) in AKA_FIELDS {
            let reference = data.get_str(reference_field).to_string();
            store_akas(self.client, &reference, akas_field, data).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for GrantHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Grant
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let input = map_from_resource_data(data, GRANT_INPUT_PROPERTIES);
        let metadata = self.client.create_grant(input).await?;
        info!("Created grant {}", metadata.id);
        data.set_id(metadata.id);

        // akas resolve from the configured references, which may be akas themselves
        self.store_all_akas(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();
        let grant = match self.client.read_grant(&id).await {
            Ok(grant) => grant,
            Err(e) => return Err(clear_if_not_found(data, e)),
        };

        data.set("level", grant.permission_level_id);
        data.set("type", grant.permission_type_id);
        data.set("identity", grant.turbot.profile_id);
        data.set("resource", grant.turbot.resource_id);

        self.store_all_akas(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        self.client.delete_grant(data.id()).await?;
        info!("Deleted grant {}", data.id());
        data.set_id("");
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool> {
        self.client.grant_exists(data.id()).await
    }
}

//! Alias resolution for id-or-aka fields.

use tracing::debug;

use crate::api::TurbotApi;
use crate::error::Result;
use crate::schema::ResourceData;

/// Fetches the current akas of the entity named by `reference` (an id or an
/// aka) and stores them in the computed list field `field`.
///
/// # Errors
///
/// Propagates the API error unchanged.
pub async fn store_akas(
    client: &dyn TurbotApi,
    reference: &str,
    field: &str,
    data: &mut ResourceData,
) -> Result<()> {
    let akas = client.get_resource_akas(reference).await?;
    debug!("Resolved {} akas for {reference} into {field}", akas.len());
    data.set(field, akas);
    Ok(())
}

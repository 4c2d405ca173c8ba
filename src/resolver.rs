//! Identity fallback for reads.
//!
//! A reference stored in state can go stale: the appliance may rename the
//! object (references embed the name) or the object may have been deleted
//! and recreated out of band. Objects created by this provider carry a
//! tracking identifier in their extensible attributes, so a stale read
//! falls back to searching for that identifier.
//!
//! ```text
//!   direct read ──ok, identifier matches──────────────▶ Direct
//!        │  404 with extattrs in state
//!        │  or ok but identifier differs
//!        ▼
//!   search by identifier ──no identifier──────────────▶ error
//!        │ ──search failed────────────────────────────▶ error
//!        │ ──0 results────────────────────────────────▶ Removed
//!        └ ──1+ results (first wins)──────────────────▶ Adopted
//! ```

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{GridApi, ListQuery, RequestOptions};
use crate::error::ProviderError;
use crate::extattrs::{self, AttributeMap, TRACKING_KEY};

/// Where a read ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The stored reference still points at the tracked object.
    Direct(Value),
    /// The object was found again through its tracking identifier.
    Adopted(Value),
    /// The object no longer exists and must be dropped from state.
    Removed,
}

/// Read an object, falling back to a tracking-identifier search.
///
/// `all` is the `extattrs_all` view from state; `None` means the object
/// type has no extensible attributes (or none were recorded), which
/// disables the fallback.
pub async fn resolve(
    api: &dyn GridApi,
    object_type: &str,
    reference: Option<&str>,
    all: Option<&AttributeMap>,
    options: &RequestOptions,
) -> Result<Resolution, ProviderError> {
    let expected = all.and_then(extattrs::tracking_id);

    let Some(reference) = reference.filter(|r| !r.is_empty()) else {
        debug!(object_type, "No reference in state, searching by tracking identifier");
        return search(api, object_type, all, options).await;
    };

    match api.get(reference, options).await {
        Ok(object) => {
            let Some(expected) = expected else {
                return Ok(Resolution::Direct(object));
            };
            let found = extattrs::from_wire(object.get("extattrs"))?;
            match extattrs::tracking_id(&found) {
                Some(id) if id == expected => Ok(Resolution::Direct(object)),
                other => {
                    warn!(
                        object_type,
                        reference,
                        expected,
                        found = other.unwrap_or(""),
                        "Reference points at a different object, searching by tracking identifier"
                    );
                    search(api, object_type, all, options).await
                }
            }
        }
        Err(err) if err.is_not_found() && all.is_some() => {
            info!(
                object_type,
                reference, "Reference not found, searching by tracking identifier"
            );
            search(api, object_type, all, options).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Search the object type for the tracking identifier recorded in `all`.
pub async fn search(
    api: &dyn GridApi,
    object_type: &str,
    all: Option<&AttributeMap>,
    options: &RequestOptions,
) -> Result<Resolution, ProviderError> {
    let Some(id) = all.and_then(extattrs::tracking_id) else {
        return Err(ProviderError::NotFound(format!(
            "{} object cannot be located: state carries no '{}' extensible attribute",
            object_type, TRACKING_KEY
        )));
    };

    let query = ListQuery::new().extattr(TRACKING_KEY, id);
    let mut found = api.list(object_type, &query, options).await?;

    if found.len() > 1 {
        warn!(
            object_type,
            tracking_id = id,
            matches = found.len(),
            "Tracking identifier matches several objects, adopting the first"
        );
    }

    if found.is_empty() {
        info!(object_type, tracking_id = id, "Tracked object no longer exists");
        Ok(Resolution::Removed)
    } else {
        let object = found.swap_remove(0);
        debug!(
            object_type,
            tracking_id = id,
            reference = ?object.get("_ref"),
            "Adopted tracked object"
        );
        Ok(Resolution::Adopted(object))
    }
}

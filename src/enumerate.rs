//! Organization repository enumeration
//!
//! Pages through the organization listing until the platform stops reporting
//! a next page. Any failed page aborts the whole enumeration; callers never
//! see a partial repository set. A next page that does not move forward is
//! treated as a failed page.

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::platform::{Platform, Repository};

/// Page size used when none is configured
pub const DEFAULT_PER_PAGE: u8 = 10;

/// List every repository owned by `org`
pub async fn list_organization_repositories<P: Platform + ?Sized>(
    platform: &P,
    org: &str,
    per_page: u8,
) -> Result<Vec<Repository>> {
    if org.trim().is_empty() {
        bail!("Organization name must not be empty");
    }
    if per_page == 0 {
        bail!("Page size must be a positive number");
    }

    let mut repositories = Vec::new();
    let mut page = 1u32;

    loop {
        let result = platform
            .list_organization_repositories(org, page, per_page)
            .await
            .with_context(|| format!("Failed to enumerate organization {} at page {}", org, page))?;

        debug!(
            "Fetched page {} of {}: {} repositories, next page {:?}",
            page,
            org,
            result.repositories.len(),
            result.next_page
        );

        repositories.extend(result.repositories);

        match result.next_page {
            None | Some(0) => break,
            Some(next) if next > page => page = next,
            Some(next) => bail!(
                "Enumeration of organization {} did not advance: page {} reported next page {}",
                org,
                page,
                next
            ),
        }
    }

    info!(
        "Found {} repositories for organization: {}",
        repositories.len(),
        org
    );
    Ok(repositories)
}

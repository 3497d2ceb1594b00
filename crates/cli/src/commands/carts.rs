//! Cart maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Show how many cart lines point at deleted products
//! catalog-cli carts prune --dry-run
//!
//! # Delete them
//! catalog-cli carts prune
//! ```

use catalog_api::db::CartRepository;

/// Remove cart lines whose product no longer exists.
///
/// Checkout already rejects such carts with "product gone"; pruning lets the
/// affected users check out the rest of their cart.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a query fails.
pub async fn prune(dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let report = CartRepository::new(&pool).prune_orphans(dry_run).await?;

    if dry_run {
        tracing::info!(
            orphaned_lines = report.orphaned_lines,
            affected_users = report.affected_users,
            "Dry run: nothing deleted"
        );
    } else {
        tracing::info!(
            orphaned_lines = report.orphaned_lines,
            affected_users = report.affected_users,
            "Pruned orphaned cart lines"
        );
    }

    Ok(())
}

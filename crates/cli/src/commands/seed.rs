//! Seed the product catalog from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! - name: Ceramic mug
//!   price: "8.50"
//!   description: 350 ml, dishwasher safe
//!   stock: 40
//!   category: kitchen
//! ```
//!
//! `image` is optional and, when present, must be a public path such as
//! `/uploads/mug.jpg`.

use std::path::Path;

use tracing::{error, info};

use catalog_api::db::ProductRepository;
use catalog_api::models::NewProduct;

/// Problems found in a seed file before anything is inserted.
fn validate(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, product) in products.iter().enumerate() {
        let label = format!("entry {} ({:?})", index + 1, product.name);
        if product.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }
        if product.category.trim().is_empty() {
            errors.push(format!("{label}: category is required"));
        }
        if product.stock < 0 {
            errors.push(format!("{label}: stock must be non-negative"));
        }
    }
    errors
}

/// Insert every product listed in `file_path`.
///
/// The whole file is parsed and validated before connecting.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, validation fails,
/// or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<NewProduct> = serde_yaml::from_str(&content)?;
    info!(count = products.len(), "Parsed products");

    let errors = validate(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let repo = ProductRepository::new(&pool);

    for product in &products {
        let created = repo.create(product).await?;
        info!(product_id = %created.id, name = %created.name, "Inserted product");
    }

    info!("Seeding complete! {} products inserted", products.len());
    Ok(())
}

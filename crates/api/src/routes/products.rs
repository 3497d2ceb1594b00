//! Product route handlers.
//!
//! Reads are public. Writes need an admin token and take
//! `multipart/form-data` so an image can travel with the fields.

use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use catalog_core::{Price, ProductId};

use super::IdPath;
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, ProductFilter, ProductUpdate};
use crate::services::ImageUpload;
use crate::services::uploads::remove_stored;
use crate::state::AppState;

/// Raw product form. Every field is optional here; create and update decide
/// which ones they need.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub stock: Option<String>,
    pub category: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProductForm {
    /// Read the known fields of a multipart body. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Multipart` for a malformed body and
    /// `AppError::Upload` for a rejected image.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if bytes.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
                        continue;
                    }
                    form.image = Some(ImageUpload::new(
                        file_name.as_deref(),
                        content_type.as_deref(),
                        bytes,
                    )?);
                }
                "name" => form.name = Some(field.text().await?),
                "price" => form.price = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "stock" => form.stock = Some(field.text().await?),
                "category" => form.category = Some(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validated values for a new product. The image path is filled in after
    /// the file is stored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first missing or invalid field.
    pub fn into_new_product(self) -> Result<(NewProduct, Option<ImageUpload>)> {
        let product = NewProduct {
            name: required_text(self.name, "name")?,
            price: parse_price(&self.price.ok_or_else(|| missing("price"))?)?,
            description: self.description.ok_or_else(|| missing("description"))?,
            stock: parse_stock(&self.stock.ok_or_else(|| missing("stock"))?)?,
            image: None,
            category: required_text(self.category, "category")?,
        };
        Ok((product, self.image))
    }

    /// Validated partial update. Absent fields stay unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn into_update(self) -> Result<(ProductUpdate, Option<ImageUpload>)> {
        let update = ProductUpdate {
            name: self
                .name
                .map(|n| required_text(Some(n), "name"))
                .transpose()?,
            price: self.price.as_deref().map(parse_price).transpose()?,
            description: self.description,
            stock: self.stock.as_deref().map(parse_stock).transpose()?,
            image: None,
            category: self
                .category
                .map(|c| required_text(Some(c), "category"))
                .transpose()?,
        };
        Ok((update, self.image))
    }
}

fn missing(field: &str) -> AppError {
    AppError::BadRequest(format!("{field} is required"))
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    let value = value.ok_or_else(|| missing(field))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(missing(field));
    }
    Ok(trimmed.to_owned())
}

fn parse_price(value: &str) -> Result<Price> {
    Price::parse(value).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_stock(value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|stock| *stock >= 0)
        .ok_or_else(|| AppError::BadRequest("stock must be a non-negative integer".to_owned()))
}

fn product_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("product not found".to_owned()),
        other => other.into(),
    }
}

/// `GET /productos`
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(products))
}

/// `GET /productos/{id}`
#[instrument(skip_all, fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    IdPath(id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    Ok(Json(product))
}

/// `POST /productos`
#[instrument(skip_all, fields(admin_id = %admin.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (mut input, image) = ProductForm::read(multipart).await?.into_new_product()?;

    let upload_dir = &state.config().upload_dir;
    if let Some(image) = &image {
        input.image = Some(image.store(upload_dir).await?);
    }

    match ProductRepository::new(state.pool()).create(&input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            Ok((StatusCode::CREATED, Json(product)))
        }
        Err(e) => {
            if let Some(path) = &input.image {
                remove_stored(upload_dir, path).await;
            }
            Err(e.into())
        }
    }
}

/// `PUT /productos/{id}`
#[instrument(skip_all, fields(admin_id = %admin.user_id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    IdPath(id): IdPath<ProductId>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (mut changes, image) = ProductForm::read(multipart).await?.into_update()?;
    let repo = ProductRepository::new(state.pool());

    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    let upload_dir = &state.config().upload_dir;
    if let Some(image) = &image {
        changes.image = Some(image.store(upload_dir).await?);
    }

    let product = match repo.update(id, &changes).await {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &changes.image {
                remove_stored(upload_dir, path).await;
            }
            return Err(product_not_found(e));
        }
    };

    if changes.image.is_some()
        && let Some(old) = &existing.image
    {
        remove_stored(upload_dir, old).await;
    }

    Ok(Json(product))
}

/// `DELETE /productos/{id}`
#[instrument(skip_all, fields(admin_id = %admin.user_id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    IdPath(id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    let image = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(product_not_found)?;

    if let Some(path) = image {
        remove_stored(&state.config().upload_dir, &path).await;
    }

    tracing::info!("Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

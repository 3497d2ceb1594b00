//! Repository and checkout behavior against a migrated `PostgreSQL`.
//!
//! Every test creates its own users and products with unique names, so the
//! suite can share one database and run in parallel.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use catalog_api::db::{
    CartRepository, CartStore, CommitOutcome, FavoriteRepository, ProductRepository,
    RepositoryError, Reservation, ReviewRepository, Shortfall, UserRepository,
};
use catalog_api::models::{NewProduct, NewReview, Product, ProductFilter};
use catalog_api::services::{CheckoutError, CheckoutService};
use catalog_core::{Email, Price, Role, Stars, UserId};
use catalog_integration_tests::database_pool;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn customer(pool: &PgPool) -> UserId {
    let email = Email::parse(&format!("buyer-{}@example.com", Uuid::new_v4())).unwrap();
    UserRepository::new(pool)
        .create("Test Buyer", &email, "not-a-real-hash", Role::Customer)
        .await
        .unwrap()
        .id
}

async fn product(pool: &PgPool, label: &str, price: &str, stock: i32) -> Product {
    ProductRepository::new(pool)
        .create(&NewProduct {
            name: format!("{label} {}", Uuid::new_v4()),
            price: Price::parse(price).unwrap(),
            description: String::new(),
            stock,
            image: None,
            category: format!("it-{}", Uuid::new_v4()),
        })
        .await
        .unwrap()
}

async fn stock(pool: &PgPool, product: &Product) -> i32 {
    ProductRepository::new(pool)
        .get_by_id(product.id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn cart_lines_merge_and_keep_insertion_order() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let first = product(&pool, "First", "1.00", 10).await;
    let second = product(&pool, "Second", "2.00", 10).await;
    let carts = CartRepository::new(&pool);

    carts.add_item(user, first.id, 1).await.unwrap();
    carts.add_item(user, second.id, 2).await.unwrap();
    carts.add_item(user, first.id, 3).await.unwrap();

    let lines = carts.cart_lines(user).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].product_id, first.id);
    assert_eq!(lines[0].quantity, 4);
    assert_eq!(lines[1].quantity, 2);

    assert!(carts.update_quantity(user, second.id, 5).await.unwrap());
    assert!(carts.remove_item(user, first.id).await.unwrap());
    assert!(!carts.remove_item(user, first.id).await.unwrap());

    let lines = carts.cart_lines(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn checkout_commits_and_clears_cart() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let a = product(&pool, "A", "10.00", 3).await;
    let b = product(&pool, "B", "0.50", 8).await;
    let carts = CartRepository::new(&pool);
    carts.add_item(user, a.id, 3).await.unwrap();
    carts.add_item(user, b.id, 2).await.unwrap();

    let receipt = CheckoutService::new(CartRepository::new(&pool))
        .checkout(user)
        .await
        .unwrap();

    assert_eq!(receipt.total_units, 5);
    assert_eq!(receipt.total, Decimal::new(3100, 2));
    assert_eq!(stock(&pool, &a).await, 0);
    assert_eq!(stock(&pool, &b).await, 6);
    assert!(carts.cart_lines(user).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn checkout_rejection_writes_nothing() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let a = product(&pool, "A", "1.00", 5).await;
    let b = product(&pool, "B", "1.00", 0).await;
    let carts = CartRepository::new(&pool);
    carts.add_item(user, a.id, 2).await.unwrap();
    carts.add_item(user, b.id, 1).await.unwrap();

    let err = CheckoutService::new(CartRepository::new(&pool))
        .checkout(user)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { product_id, .. } if product_id == b.id
    ));
    assert_eq!(stock(&pool, &a).await, 5);
    assert_eq!(carts.cart_lines(user).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn deleted_product_stays_in_cart_and_blocks_checkout() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let kept = product(&pool, "Kept", "1.00", 5).await;
    let gone = product(&pool, "Gone", "1.00", 5).await;
    let carts = CartRepository::new(&pool);
    carts.add_item(user, kept.id, 1).await.unwrap();
    carts.add_item(user, gone.id, 1).await.unwrap();
    ProductRepository::new(&pool).delete(gone.id).await.unwrap();

    let lines = carts.cart_lines(user).await.unwrap();
    assert!(lines[1].product.is_none());

    let err = CheckoutService::new(CartRepository::new(&pool))
        .checkout(user)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductGone { product_id } if product_id == gone.id));
    assert_eq!(stock(&pool, &kept).await, 5);

    let report = carts.prune_orphans(true).await.unwrap();
    assert!(report.orphaned_lines >= 1);
    assert_eq!(carts.cart_lines(user).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn concurrent_checkouts_never_oversell() {
    let pool = database_pool().await;
    let scarce = product(&pool, "Scarce", "3.00", 2).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let user = customer(&pool).await;
        CartRepository::new(&pool)
            .add_item(user, scarce.id, 1)
            .await
            .unwrap();
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            CheckoutService::new(CartRepository::new(&pool))
                .checkout(user)
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(err.is_rejection(), "unexpected error: {err}"),
        }
    }

    assert_eq!(successes, 2);
    assert_eq!(stock(&pool, &scarce).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn double_submit_reserves_cart_once() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let item = product(&pool, "Twice", "4.00", 5).await;
    CartRepository::new(&pool)
        .add_item(user, item.id, 2)
        .await
        .unwrap();

    let submit = || {
        let pool = pool.clone();
        tokio::spawn(async move {
            CheckoutService::new(CartRepository::new(&pool))
                .checkout(user)
                .await
        })
    };
    let (first, second) = tokio::join!(submit(), submit());
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(CheckoutError::CartChanged { .. } | CheckoutError::EmptyCart)
    )));
    assert_eq!(stock(&pool, &item).await, 3);
    assert!(
        CartRepository::new(&pool)
            .cart_lines(user)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn commit_rejects_reservation_larger_than_line() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let item = product(&pool, "Lowered", "1.00", 5).await;
    let carts = CartRepository::new(&pool);
    carts.add_item(user, item.id, 1).await.unwrap();

    let outcome = carts
        .commit_checkout(
            user,
            &[Reservation {
                product_id: item.id,
                quantity: 3,
            }],
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CommitOutcome::Rejected(Shortfall::CartChanged(item.id))
    );
    assert_eq!(stock(&pool, &item).await, 5);
    assert_eq!(carts.cart_lines(user).await.unwrap()[0].quantity, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn duplicate_email_is_a_conflict() {
    let pool = database_pool().await;
    let email = Email::parse(&format!("dup-{}@example.com", Uuid::new_v4())).unwrap();
    let users = UserRepository::new(&pool);

    users
        .create("First", &email, "hash", Role::Customer)
        .await
        .unwrap();
    let err = users
        .create("Second", &email, "hash", Role::Customer)
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn product_search_filters_by_name_and_category() {
    let pool = database_pool().await;
    let target = product(&pool, "Zephyr kettle", "15.00", 1).await;
    product(&pool, "Other", "15.00", 1).await;
    let products = ProductRepository::new(&pool);

    let by_category = products
        .list(&ProductFilter {
            q: None,
            category: Some(target.category.clone()),
        })
        .await
        .unwrap();
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].id, target.id);

    let by_name = products
        .list(&ProductFilter {
            q: Some(target.name.to_uppercase()),
            category: None,
        })
        .await
        .unwrap();
    assert!(by_name.iter().any(|p| p.id == target.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn favorites_are_idempotent() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let item = product(&pool, "Fav", "1.00", 1).await;
    let favorites = FavoriteRepository::new(&pool);

    favorites.add(user, item.id).await.unwrap();
    favorites.add(user, item.id).await.unwrap();
    assert_eq!(favorites.list(user).await.unwrap().len(), 1);

    favorites.remove(user, item.id).await.unwrap();
    favorites.remove(user, item.id).await.unwrap();
    assert!(favorites.list(user).await.unwrap().is_empty());

    ProductRepository::new(&pool).delete(item.id).await.unwrap();
    assert!(matches!(
        favorites.add(user, item.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (CATALOG_TEST_DATABASE_URL)"]
async fn reviews_average_their_stars() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let item = product(&pool, "Reviewed", "1.00", 1).await;
    let reviews = ReviewRepository::new(&pool);

    assert_eq!(reviews.average_stars(item.id).await.unwrap(), None);

    for stars in [5, 4, 4] {
        reviews
            .create(
                item.id,
                user,
                &NewReview {
                    comment: "solid".to_owned(),
                    stars: Stars::new(stars).unwrap(),
                },
            )
            .await
            .unwrap();
    }

    let listed = reviews.list_for_product(item.id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].author_name, "Test Buyer");

    let average = reviews.average_stars(item.id).await.unwrap().unwrap();
    assert_eq!(average.round_dp(2), Decimal::new(433, 2));
}

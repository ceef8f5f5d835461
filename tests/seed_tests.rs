#![cfg(all(feature = "sqlite", not(feature = "postgres")))]

use tempfile::TempDir;

use timeline_bench::db::{self, Pool};
use timeline_bench::domain::{Distribution, EntityKind};
use timeline_bench::seed::{self, SeedOptions};

// File-backed so every pooled connection sees the same database
async fn create_test_pool() -> (TempDir, Pool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("seed.db").display());
    let pool = db::create_pool(&url, 5).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

fn options(users: usize, posts: usize, fmin: usize, fmax: usize) -> SeedOptions {
    SeedOptions {
        users,
        posts,
        follows_min: fmin,
        follows_max: fmax,
        prefix: "user".to_string(),
        batch_size: 100,
        distribution: Distribution::Even,
        rng_seed: Some(7),
        dry_run: false,
    }
}

#[tokio::test]
async fn test_seed_counts_match_request() {
    let (_dir, pool) = create_test_pool().await;

    let report = seed::run(&pool, &options(100, 5000, 20, 20)).await.unwrap();
    assert_eq!(report.users_created, 100);
    assert_eq!(report.follows_created, 2000);
    assert_eq!(report.posts_created, 5000);

    assert_eq!(db::count(&pool, EntityKind::User).await.unwrap(), 100);
    assert_eq!(db::count(&pool, EntityKind::Post).await.unwrap(), 5000);
    assert_eq!(db::count(&pool, EntityKind::Follow).await.unwrap(), 2000);

    let posts = db::posts_per_user(&pool).await.unwrap();
    assert_eq!(posts.len(), 100);
    assert!(posts.values().all(|&n| n == 50));

    let follows = db::follows_per_user(&pool).await.unwrap();
    assert_eq!(follows.len(), 100);
    assert!(follows.values().all(|&n| n == 20));
}

#[tokio::test]
async fn test_uneven_posts_round_per_user() {
    let (_dir, pool) = create_test_pool().await;

    seed::run(&pool, &options(3, 10, 0, 0)).await.unwrap();

    let posts = db::posts_per_user(&pool).await.unwrap();
    let mut counts: Vec<i64> = posts.values().copied().collect();
    counts.sort();
    assert_eq!(counts, vec![3, 3, 4]);
}

#[tokio::test]
async fn test_reseeding_keeps_users_and_adds_posts() {
    let (_dir, pool) = create_test_pool().await;
    let opts = options(10, 20, 1, 3);

    seed::run(&pool, &opts).await.unwrap();
    let second = seed::run(&pool, &opts).await.unwrap();

    assert_eq!(second.users_created, 0);
    // Same RNG seed, same follow graph: nothing new to merge.
    assert_eq!(second.follows_created, 0);
    assert_eq!(second.posts_created, 20);
    assert_eq!(db::count(&pool, EntityKind::User).await.unwrap(), 10);
    assert_eq!(db::count(&pool, EntityKind::Post).await.unwrap(), 40);
}

#[tokio::test]
async fn test_small_batches_insert_everything() {
    let (_dir, pool) = create_test_pool().await;
    let mut opts = options(4, 23, 0, 0);
    opts.batch_size = 5;

    let report = seed::run(&pool, &opts).await.unwrap();
    assert_eq!(report.posts_created, 23);
    assert_eq!(db::count(&pool, EntityKind::Post).await.unwrap(), 23);
}

#[tokio::test]
async fn test_batch_larger_than_bind_limit() {
    let (_dir, pool) = create_test_pool().await;
    let mut opts = options(10, 10000, 0, 0);
    opts.batch_size = 10000;

    let report = seed::run(&pool, &opts).await.unwrap();
    assert_eq!(report.posts_created, 10000);
    assert_eq!(db::count(&pool, EntityKind::Post).await.unwrap(), 10000);
}

#[tokio::test]
async fn test_failed_seed_writes_nothing() {
    let (_dir, pool) = create_test_pool().await;
    sqlx::query("DROP TABLE posts").execute(&pool).await.unwrap();

    let result = seed::run(&pool, &options(10, 20, 1, 3)).await;
    assert!(result.is_err());
    assert_eq!(db::count(&pool, EntityKind::User).await.unwrap(), 0);
    assert_eq!(db::count(&pool, EntityKind::Follow).await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_options_write_nothing() {
    let (_dir, pool) = create_test_pool().await;

    let result = seed::run(&pool, &options(5, 10, 3, 1)).await;
    assert!(result.is_err());
    assert_eq!(db::count(&pool, EntityKind::User).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reset_clears_every_kind() {
    let (_dir, pool) = create_test_pool().await;
    seed::run(&pool, &options(5, 30, 1, 3)).await.unwrap();

    let report = seed::reset(&pool).await.unwrap();
    assert_eq!(report.deleted.len(), 3);
    assert_eq!(report.deleted[1], (EntityKind::Post, 30));
    assert_eq!(report.deleted[2], (EntityKind::User, 5));

    for kind in EntityKind::RESET_ORDER {
        assert_eq!(db::count(&pool, kind).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_reset_is_idempotent_on_empty_store() {
    let (_dir, pool) = create_test_pool().await;

    let first = seed::reset(&pool).await.unwrap();
    let second = seed::reset(&pool).await.unwrap();
    assert_eq!(first.total(), 0);
    assert_eq!(second.total(), 0);
    assert_eq!(db::count(&pool, EntityKind::User).await.unwrap(), 0);
}

#[tokio::test]
async fn test_migrations_are_rerunnable() {
    let (_dir, pool) = create_test_pool().await;
    db::run_migrations(&pool).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
}

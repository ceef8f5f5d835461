use std::collections::HashMap;

use sqlx::QueryBuilder;
use tracing::debug;

use crate::domain::{EntityKind, Follow, Post, User};
use crate::error::Result;

#[cfg(feature = "postgres")]
pub type Pool = sqlx::PgPool;
#[cfg(feature = "postgres")]
pub type PoolOptions = sqlx::postgres::PgPoolOptions;
#[cfg(feature = "postgres")]
pub type Db = sqlx::Postgres;
#[cfg(feature = "postgres")]
pub type Conn = sqlx::PgConnection;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Pool = sqlx::SqlitePool;
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type PoolOptions = sqlx::sqlite::SqlitePoolOptions;
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Db = sqlx::Sqlite;
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Conn = sqlx::SqliteConnection;

/// Rows per multi-row INSERT. Keeps the widest statement (posts, 4 binds per
/// row) far below SQLite's 32766 and Postgres's 65535 bind limits.
pub const INSERT_CHUNK: usize = 500;

pub async fn create_pool(url: &str, max_connections: u32) -> Result<Pool> {
    let pool = PoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    #[cfg(feature = "postgres")]
    let sql = include_str!("../../migrations/postgres/001_initial.sql");

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let sql = include_str!("../../migrations/sqlite/001_initial.sql");

    sqlx::raw_sql(sql).execute(pool).await?;
    Ok(())
}

/// Insert users, leaving existing ones untouched. Returns how many were new.
pub async fn insert_users(conn: &mut Conn, users: &[User]) -> Result<u64> {
    let mut created = 0;
    for chunk in users.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Db> = QueryBuilder::new("INSERT INTO users (name, created_at) ");
        qb.push_values(chunk, |mut b, user| {
            b.push_bind(user.name.0.clone()).push_bind(user.created_at);
        });
        qb.push(" ON CONFLICT (name) DO NOTHING");
        created += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(created)
}

/// Insert follow edges, merging with the ones already stored.
pub async fn insert_follows(conn: &mut Conn, follows: &[Follow]) -> Result<u64> {
    let mut created = 0;
    for chunk in follows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Db> =
            QueryBuilder::new("INSERT INTO follows (follower, followee) ");
        qb.push_values(chunk, |mut b, follow| {
            b.push_bind(follow.follower.0.clone())
                .push_bind(follow.followee.0.clone());
        });
        qb.push(" ON CONFLICT (follower, followee) DO NOTHING");
        created += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(created)
}

/// Insert a batch of posts, split into statements of at most `INSERT_CHUNK`
/// rows.
pub async fn insert_posts(conn: &mut Conn, posts: &[Post]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in posts.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Db> =
            QueryBuilder::new("INSERT INTO posts (id, author, content, created_at) ");
        qb.push_values(chunk, |mut b, post| {
            b.push_bind(post.id.to_string())
                .push_bind(post.author.0.clone())
                .push_bind(post.content.clone())
                .push_bind(post.created_at);
        });
        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    debug!("Inserted {} posts", inserted);
    Ok(inserted)
}

pub async fn count(pool: &Pool, kind: EntityKind) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let n: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(n)
}

/// Delete every entity of `kind`. Returns the number of rows removed.
pub async fn delete_all(pool: &Pool, kind: EntityKind) -> Result<u64> {
    let sql = format!("DELETE FROM {}", kind.table());
    let result = sqlx::query(&sql).execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn posts_per_user(pool: &Pool) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT author, COUNT(*) FROM posts GROUP BY author")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

pub async fn follows_per_user(pool: &Pool) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT follower, COUNT(*) FROM follows GROUP BY follower")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

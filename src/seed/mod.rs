//! Bulk population of the datastore behind the application under test.
//!
//! Users are named `<prefix>1 ..= <prefix>N`, the same convention the load
//! generator uses to pick whose timeline to read. Writes go straight to the
//! datastore rather than through the application's API.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::db::{self, Pool};
use crate::domain::{usernames, Distribution, EntityKind, Follow, Post, PostId, User, UserName};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub users: usize,
    pub posts: usize,
    pub follows_min: usize,
    pub follows_max: usize,
    pub prefix: String,
    pub batch_size: usize,
    pub distribution: Distribution,
    pub rng_seed: Option<u64>,
    pub dry_run: bool,
}

impl SeedOptions {
    pub fn validate(&self) -> Result<()> {
        if self.follows_min > self.follows_max {
            return Err(Error::InvalidArgument(format!(
                "--follows-min ({}) is larger than --follows-max ({})",
                self.follows_min, self.follows_max
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "--batch-size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Everything a seeding run will write, generated up front.
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub users: Vec<User>,
    pub follows: Vec<Follow>,
    pub posts: Vec<Post>,
}

impl SeedPlan {
    pub fn generate(options: &SeedOptions, now: DateTime<Utc>) -> Self {
        let mut rng = options.rng();
        let names = usernames(&options.prefix, options.users);

        let users = names
            .iter()
            .map(|name| User {
                name: name.clone(),
                created_at: now,
            })
            .collect();

        let follows = pick_follows(&names, options.follows_min, options.follows_max, &mut rng);
        let posts = generate_posts(&names, options.posts, options.distribution, now, &mut rng);

        Self {
            users,
            follows,
            posts,
        }
    }
}

/// For each user, `k` distinct other users where `k` is drawn uniformly from
/// `[min, max]`, both clamped to the number of other users.
fn pick_follows(names: &[UserName], min: usize, max: usize, rng: &mut impl Rng) -> Vec<Follow> {
    let mut follows = Vec::new();
    for name in names {
        let others: Vec<&UserName> = names.iter().filter(|other| *other != name).collect();
        if others.is_empty() {
            continue;
        }
        let lo = min.min(others.len());
        let hi = max.min(others.len()).max(lo);
        let target = rng.random_range(lo..=hi);

        let mut chosen: Vec<&UserName> = others.choose_multiple(rng, target).copied().collect();
        chosen.sort();
        follows.extend(chosen.into_iter().map(|followee| Follow {
            follower: name.clone(),
            followee: followee.clone(),
        }));
    }
    follows
}

fn generate_posts(
    names: &[UserName],
    total: usize,
    distribution: Distribution,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Vec<Post> {
    if names.is_empty() {
        return Vec::new();
    }

    (0..total)
        .map(|i| {
            let author = match distribution {
                Distribution::Even => &names[i % names.len()],
                Distribution::Random => &names[rng.random_range(0..names.len())],
            };
            Post {
                id: PostId::new(),
                author: author.clone(),
                content: format!("Seed post {} by {}", i + 1, author),
                // Staggered so the newest-first ordering matches creation order.
                created_at: now - Duration::seconds(i as i64),
            }
        })
        .collect()
}

/// Row counts of a seeding run. For a dry run they are the planned rows,
/// without checking which of them already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: u64,
    pub follows_created: u64,
    pub posts_created: u64,
    pub dry_run: bool,
}

impl SeedReport {
    pub fn planned(plan: &SeedPlan) -> Self {
        Self {
            users_created: plan.users.len() as u64,
            follows_created: plan.follows.len() as u64,
            posts_created: plan.posts.len() as u64,
            dry_run: true,
        }
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "[Dry-Run] Planned users: {}, follow edges: {}, posts: {} (existing rows not checked)",
                self.users_created, self.follows_created, self.posts_created
            )
        } else {
            write!(
                f,
                "Users created: {}, follow edges: {}, posts: {}",
                self.users_created, self.follows_created, self.posts_created
            )
        }
    }
}

pub fn dry_run(options: &SeedOptions) -> Result<SeedReport> {
    options.validate()?;
    let plan = SeedPlan::generate(options, Utc::now());
    info!("[Dry-Run] Nothing will be written");
    log_plan(options, &plan);
    Ok(SeedReport::planned(&plan))
}

/// Generate a plan and write it. Any datastore error aborts the run.
pub async fn run(pool: &Pool, options: &SeedOptions) -> Result<SeedReport> {
    options.validate()?;
    let plan = SeedPlan::generate(options, Utc::now());
    log_plan(options, &plan);
    apply(pool, &plan, options.batch_size).await
}

/// Write `plan` in one transaction: a failure part-way leaves the datastore
/// as it was.
pub async fn apply(pool: &Pool, plan: &SeedPlan, batch_size: usize) -> Result<SeedReport> {
    let start = Instant::now();
    let batch_size = batch_size.max(1);
    let mut tx = pool.begin().await?;

    let users_created = db::insert_users(&mut *tx, &plan.users).await?;
    info!("New users created: {}", users_created);

    let follows_created = db::insert_follows(&mut *tx, &plan.follows).await?;
    info!("Follow relations added: {}", follows_created);

    let total_batches = plan.posts.len().div_ceil(batch_size);
    info!(
        "Creating {} posts in batches of {}...",
        plan.posts.len(),
        batch_size
    );
    let mut posts_created = 0;
    for (i, batch) in plan.posts.chunks(batch_size).enumerate() {
        posts_created += db::insert_posts(&mut *tx, batch).await?;
        debug!("  Batch {}/{} ({} posts)", i + 1, total_batches, batch.len());
        if (i + 1) % 10 == 0 || i + 1 == total_batches {
            info!(
                "  Progress: {}/{} posts ({} batches)",
                posts_created,
                plan.posts.len(),
                i + 1
            );
        }
    }

    tx.commit().await?;
    info!("Seeding complete in {:?}", start.elapsed());
    Ok(SeedReport {
        users_created,
        follows_created,
        posts_created,
        dry_run: false,
    })
}

fn log_plan(options: &SeedOptions, plan: &SeedPlan) {
    info!(
        "Target users: {}..{} ({} users)",
        UserName::numbered(&options.prefix, 1),
        UserName::numbered(&options.prefix, options.users),
        plan.users.len()
    );
    info!(
        "Follows per user: {}..={} ({} edges), posts: {} ({:?} distribution)",
        options.follows_min,
        options.follows_max,
        plan.follows.len(),
        plan.posts.len(),
        options.distribution
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub deleted: Vec<(EntityKind, u64)>,
}

impl ResetReport {
    pub fn total(&self) -> u64 {
        self.deleted.iter().map(|(_, n)| n).sum()
    }
}

/// Delete every follow, post and user so the next benchmark starts empty.
/// Safe to repeat on an empty datastore.
pub async fn reset(pool: &Pool) -> Result<ResetReport> {
    let mut report = ResetReport::default();
    for kind in EntityKind::RESET_ORDER {
        info!("Deleting all entities of kind: {}", kind);
        let deleted = db::delete_all(pool, kind).await?;
        if deleted == 0 {
            info!("  -> No entities found.");
        } else {
            info!("  -> Deleted {} entities", deleted);
        }
        report.deleted.push((kind, deleted));
    }
    info!("Datastore reset complete.");
    Ok(report)
}

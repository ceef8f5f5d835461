use std::fmt;
use uuid::Uuid;

/// Name of a seeded user: the configured prefix followed by a 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserName(pub String);

impl UserName {
    pub fn numbered(prefix: &str, index: usize) -> Self {
        Self(format!("{}{}", prefix, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `prefix1 ..= prefix{count}`, the naming convention shared by the seeder and
/// the load generator.
pub fn usernames(prefix: &str, count: usize) -> Vec<UserName> {
    (1..=count).map(|i| UserName::numbered(prefix, i)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The entity kinds the seeder writes, in the order a reset must delete them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Follow,
    Post,
    User,
}

impl EntityKind {
    pub const RESET_ORDER: [EntityKind; 3] = [EntityKind::Follow, EntityKind::Post, EntityKind::User];

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Follow => "follows",
            EntityKind::Post => "posts",
            EntityKind::User => "users",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Follow => "Follow",
            EntityKind::Post => "Post",
            EntityKind::User => "User",
        };
        write!(f, "{}", s)
    }
}

/// How seeded posts are assigned to authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Distribution {
    /// Round-robin: every user gets floor(P/U) or ceil(P/U) posts.
    #[default]
    Even,
    /// Each post picks its author uniformly at random.
    Random,
}

/// A benchmark dimension. Each one owns its CSV file, default parameter
/// values and chart labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Scenario {
    /// PARAM is the number of simultaneous users.
    Conc,
    /// PARAM is the number of posts per user; concurrency is fixed.
    Post,
    /// PARAM is the number of followees per user; concurrency is fixed.
    Fanout,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Conc, Scenario::Post, Scenario::Fanout];

    pub const DEFAULT_FIXED_CONCURRENCY: u32 = 50;

    pub fn file_stem(&self) -> &'static str {
        match self {
            Scenario::Conc => "conc",
            Scenario::Post => "post",
            Scenario::Fanout => "fanout",
        }
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.file_stem())
    }

    pub fn png_file_name(&self) -> String {
        format!("{}.png", self.file_stem())
    }

    pub fn default_params(&self) -> &'static [u32] {
        match self {
            Scenario::Conc => &[1, 10, 20, 50, 100, 1000],
            Scenario::Post => &[10, 100, 1000],
            Scenario::Fanout => &[10, 50, 100],
        }
    }

    /// Number of simultaneous requests issued for `param`. Only the
    /// concurrency scenario varies it; the others keep `fixed`.
    pub fn concurrency_for(&self, param: u32, fixed: u32) -> u32 {
        match self {
            Scenario::Conc => param,
            Scenario::Post | Scenario::Fanout => fixed,
        }
    }

    pub fn chart_title(&self) -> &'static str {
        match self {
            Scenario::Conc => "Average time per request by concurrency",
            Scenario::Post => "Average time per request by posts per user",
            Scenario::Fanout => "Average time per request by followees per user",
        }
    }

    pub fn x_label(&self) -> &'static str {
        match self {
            Scenario::Conc => "Concurrent users",
            Scenario::Post => "Posts per user",
            Scenario::Fanout => "Followees per user",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_numbered() {
        assert_eq!(UserName::numbered("user", 7).0, "user7");
        assert_eq!(UserName::numbered("load", 1).to_string(), "load1");
    }

    #[test]
    fn test_usernames_are_one_based() {
        let names = usernames("user", 3);
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["user1", "user2", "user3"]);
    }

    #[test]
    fn test_usernames_zero() {
        assert!(usernames("user", 0).is_empty());
    }


    #[test]
    fn test_entity_kind_reset_order() {
        let tables: Vec<&str> = EntityKind::RESET_ORDER.iter().map(|k| k.table()).collect();
        assert_eq!(tables, vec!["follows", "posts", "users"]);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::User.to_string(), "User");
        assert_eq!(EntityKind::Follow.to_string(), "Follow");
    }

    #[test]
    fn test_scenario_files() {
        assert_eq!(Scenario::Conc.csv_file_name(), "conc.csv");
        assert_eq!(Scenario::Post.csv_file_name(), "post.csv");
        assert_eq!(Scenario::Fanout.png_file_name(), "fanout.png");
    }

    #[test]
    fn test_scenario_concurrency_for() {
        assert_eq!(Scenario::Conc.concurrency_for(100, 50), 100);
        assert_eq!(Scenario::Post.concurrency_for(1000, 50), 50);
        assert_eq!(Scenario::Fanout.concurrency_for(10, 25), 25);
    }

    #[test]
    fn test_scenario_default_params() {
        assert_eq!(Scenario::Conc.default_params(), &[1, 10, 20, 50, 100, 1000]);
        assert_eq!(Scenario::Fanout.default_params(), &[10, 50, 100]);
    }

    #[test]
    fn test_distribution_default() {
        assert_eq!(Distribution::default(), Distribution::Even);
    }
}

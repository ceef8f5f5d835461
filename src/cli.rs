use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::config::Settings;
use crate::domain::{Distribution, Scenario};
use crate::error::Result;
use crate::load::BenchConfig;
use crate::seed::SeedOptions;

#[derive(Debug, Parser)]
#[command(name = "timeline-bench", version, about = "Seed, load-test and chart a TinyInsta deployment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Populate the datastore with users, follow edges and posts
    Seed(SeedArgs),
    /// Delete every user, post and follow edge
    Reset(ResetArgs),
    /// Drive concurrent timeline reads and append timings to a CSV file
    Bench(BenchArgs),
    /// Render one chart per benchmark CSV
    Plot(PlotArgs),
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Number of users to create (<prefix>1 ..= <prefix>N)
    #[arg(long, default_value_t = 5)]
    pub users: usize,

    /// Total number of posts to spread over the users
    #[arg(long, default_value_t = 30)]
    pub posts: usize,

    /// Minimum number of followees per user
    #[arg(long, default_value_t = 1)]
    pub follows_min: usize,

    /// Maximum number of followees per user
    #[arg(long, default_value_t = 3)]
    pub follows_max: usize,

    /// User name prefix [default: configured user_prefix]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Posts per INSERT statement
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// How posts are assigned to authors
    #[arg(long, value_enum, default_value_t = Distribution::Even)]
    pub distribution: Distribution,

    /// Seed for the random generator, for reproducible follow graphs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Build and log the plan without writing anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl SeedArgs {
    pub fn to_options(&self, settings: &Settings) -> SeedOptions {
        SeedOptions {
            users: self.users,
            posts: self.posts,
            follows_min: self.follows_min,
            follows_max: self.follows_max,
            prefix: self
                .prefix
                .clone()
                .unwrap_or_else(|| settings.user_prefix.clone()),
            batch_size: self.batch_size,
            distribution: self.distribution,
            rng_seed: self.seed,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct BenchArgs {
    /// Which dimension PARAM describes
    #[arg(value_enum)]
    pub scenario: Scenario,

    /// Base URL of the deployed application
    #[arg(long)]
    pub base_url: Option<String>,

    /// CSV file to append to [default: <out_dir>/<scenario>.csv]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Prefix of the seeded user names
    #[arg(long)]
    pub user_prefix: Option<String>,

    /// PARAM values to measure [default: the scenario's own list]
    #[arg(long, num_args = 1..)]
    pub params: Vec<u32>,

    /// Measured runs per PARAM
    #[arg(long)]
    pub runs: Option<u32>,

    /// Simultaneous users for the post and fanout scenarios
    #[arg(long, default_value_t = Scenario::DEFAULT_FIXED_CONCURRENCY)]
    pub concurrency: u32,

    /// Total number of seeded users available
    #[arg(long, default_value_t = 1000)]
    pub max_users: u32,

    /// Timeline `limit` query parameter
    #[arg(long)]
    pub limit: Option<u32>,

    /// Discarded batches before the measured runs of each PARAM
    #[arg(long)]
    pub warmup: Option<u32>,

    /// Per-request timeout; a timed-out request counts as failed
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl BenchArgs {
    pub fn to_config(&self, settings: &Settings) -> Result<BenchConfig> {
        let base_url = self.base_url.as_deref().unwrap_or(&settings.base_url);
        let params = if self.params.is_empty() {
            self.scenario.default_params().to_vec()
        } else {
            self.params.clone()
        };

        Ok(BenchConfig {
            scenario: self.scenario,
            base_url: Url::parse(base_url)?,
            user_prefix: self
                .user_prefix
                .clone()
                .unwrap_or_else(|| settings.user_prefix.clone()),
            params,
            runs: self.runs.unwrap_or(settings.runs),
            fixed_concurrency: self.concurrency,
            max_users: self.max_users,
            limit: self.limit.unwrap_or(settings.timeline_limit),
            warmup_rounds: self.warmup.unwrap_or(settings.warmup_rounds),
            timeout: self
                .timeout_secs
                .or(settings.request_timeout_secs)
                .map(Duration::from_secs),
        })
    }

    pub fn out_path(&self, settings: &Settings) -> PathBuf {
        self.out.clone().unwrap_or_else(|| {
            PathBuf::from(&settings.out_dir).join(self.scenario.csv_file_name())
        })
    }
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Scenarios to plot [default: all]
    #[arg(value_enum)]
    pub scenarios: Vec<Scenario>,

    /// Directory holding the CSV files; charts are written next to them
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

impl PlotArgs {
    pub fn selected(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            Scenario::ALL.to_vec()
        } else {
            self.scenarios.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("timeline-bench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_args() {
        let cli = parse(&[
            "seed",
            "--users",
            "100",
            "--posts",
            "5000",
            "--follows-min",
            "20",
            "--follows-max",
            "20",
            "--dry-run",
        ]);
        let Command::Seed(args) = cli.command else {
            panic!("expected seed");
        };
        let options = args.to_options(&Settings::default());
        assert_eq!(options.users, 100);
        assert_eq!(options.posts, 5000);
        assert_eq!(options.follows_min, 20);
        assert_eq!(options.prefix, "user");
        assert_eq!(options.distribution, Distribution::Even);
        assert!(options.dry_run);
    }

    #[test]
    fn test_bench_defaults_come_from_scenario_and_settings() {
        let cli = parse(&["bench", "fanout"]);
        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        let settings = Settings::default();
        let config = args.to_config(&settings).unwrap();
        assert_eq!(config.scenario, Scenario::Fanout);
        assert_eq!(config.params, vec![10, 50, 100]);
        assert_eq!(config.runs, 3);
        assert_eq!(config.fixed_concurrency, 50);
        assert_eq!(config.limit, 20);
        assert_eq!(config.warmup_rounds, 1);
        assert!(config.timeout.is_none());
        assert_eq!(args.out_path(&settings), PathBuf::from("out/fanout.csv"));
    }

    #[test]
    fn test_bench_flags_override() {
        let cli = parse(&[
            "bench",
            "conc",
            "--base-url",
            "https://insta.example.com",
            "--params",
            "1",
            "10",
            "50",
            "--runs",
            "2",
            "--warmup",
            "0",
            "--timeout-secs",
            "30",
            "--out",
            "results/c.csv",
        ]);
        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        let settings = Settings::default();
        let config = args.to_config(&settings).unwrap();
        assert_eq!(config.base_url.as_str(), "https://insta.example.com/");
        assert_eq!(config.params, vec![1, 10, 50]);
        assert_eq!(config.runs, 2);
        assert_eq!(config.warmup_rounds, 0);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(args.out_path(&settings), PathBuf::from("results/c.csv"));
    }

    #[test]
    fn test_bench_rejects_bad_base_url() {
        let cli = parse(&["bench", "conc", "--base-url", "not a url"]);
        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        assert!(args.to_config(&Settings::default()).is_err());
    }

    #[test]
    fn test_bench_rejects_unknown_scenario() {
        let result = Cli::try_parse_from(["timeline-bench", "bench", "latency"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_plot_defaults_to_all() {
        let cli = parse(&["plot"]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.selected(), Scenario::ALL.to_vec());

        let cli = parse(&["plot", "conc", "--out-dir", "results"]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.selected(), vec![Scenario::Conc]);
        assert_eq!(args.out_dir, Some(PathBuf::from("results")));
    }
}

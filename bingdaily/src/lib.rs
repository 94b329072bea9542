pub use crate::app::{failure_stage, BingDailyApp};
pub use crate::cli::{exits_through_clap, Cli};

pub mod cli {
    use std::path::PathBuf;
    use std::time::Duration;

    use anyhow::{anyhow, Context, Result};
    use bingdaily_core::core::fetch::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_ATTEMPTS};
    use bingdaily_core::RetryPolicy;
    use clap::error::ErrorKind;
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(name = "bingdaily")]
    #[command(about = "Set Bing's image of the day as the desktop background")]
    #[command(version)]
    pub struct Cli {
        /// Directory holding downloaded images [default: <user cache>/bing-wallpaper]
        #[arg(long, value_name = "DIR")]
        pub cache_dir: Option<PathBuf>,

        /// Bing market code, e.g. en-US
        #[arg(long, value_parser = parse_market)]
        pub market: Option<String>,

        /// Cache today's image without changing the wallpaper
        #[arg(long)]
        pub download_only: bool,

        /// Attempts per URL before giving up
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        pub max_attempts: u32,

        /// Delay after the first failed attempt, in seconds
        #[arg(long, value_name = "SECS", default_value_t = 1.0)]
        pub initial_backoff: f64,

        /// Factor applied to the delay after each further failure
        #[arg(long, default_value_t = DEFAULT_BACKOFF_MULTIPLIER)]
        pub backoff_multiplier: f64,

        /// Metadata request timeout, in seconds
        #[arg(long, value_name = "SECS", default_value_t = 15.0)]
        pub timeout: f64,

        /// Debug logging (RUST_LOG takes precedence)
        #[arg(short, long)]
        pub verbose: bool,
    }

    impl Cli {
        pub fn retry_policy(&self) -> Result<RetryPolicy> {
            let initial_backoff = seconds(self.initial_backoff).context("--initial-backoff")?;
            let timeout = seconds(self.timeout).context("--timeout")?;
            RetryPolicy::new(
                self.max_attempts,
                initial_backoff,
                self.backoff_multiplier,
                timeout,
            )
            .context("invalid retry policy")
        }
    }

    fn seconds(value: f64) -> Result<Duration> {
        Duration::try_from_secs_f64(value).map_err(|e| anyhow!("invalid duration {}: {}", value, e))
    }

    /// Help and version output keep clap's own exit; every other parse error is a failed run.
    pub fn exits_through_clap(err: &clap::Error) -> bool {
        matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
    }

    fn parse_market(s: &str) -> Result<String, String> {
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            Ok(s.to_string())
        } else {
            Err(format!("invalid market code `{}`", s))
        }
    }

}

mod app {
    use anyhow::{Context, Result};
    use bingdaily_core::{
        run_once, Config, GnomeWallpaper, MetadataError, Provider, ResilientFetcher, RunError,
        RunOptions, RunOutcome,
    };
    use log::debug;

    use crate::cli::Cli;

    pub struct BingDailyApp {
        options: RunOptions,
        fetcher: ResilientFetcher,
        wallpaper: GnomeWallpaper,
    }

    impl BingDailyApp {
        pub fn new(cli: &Cli) -> Result<Self> {
            let policy = cli.retry_policy()?;

            let cache_dir = match &cli.cache_dir {
                Some(dir) => dir.clone(),
                None => Config::default_cache_dir().context("Failed to get project directories")?,
            };

            let mut provider = Provider::bing();
            if let Some(market) = &cli.market {
                provider = provider.with_market(market.as_str());
            }

            let mut options = RunOptions::for_today(Config::with_cache_dir(cache_dir), provider);
            options.download_only = cli.download_only;
            debug!("Run options: {:?}, retry policy: {:?}", options, policy);

            Ok(Self {
                options,
                fetcher: ResilientFetcher::new(policy),
                wallpaper: GnomeWallpaper::default(),
            })
        }

        pub fn options(&self) -> &RunOptions {
            &self.options
        }

        pub fn run(&self) -> Result<RunOutcome, RunError> {
            run_once(&self.options, &self.fetcher, &self.wallpaper)
        }
    }

    /// Which step of the run an error came from, for the operator log.
    pub fn failure_stage(err: &RunError) -> &'static str {
        match err {
            RunError::CacheDir { .. } => "cache",
            RunError::Metadata(MetadataError::Fetch(_)) => "network",
            RunError::Metadata(_) => "metadata",
            RunError::Download(_) => "download",
            RunError::Apply(_) => "wallpaper",
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use bingdaily_core::{ApplyError, DownloadError};
        use clap::Parser;
        use std::path::PathBuf;

        #[test]
        fn builds_options_from_flags() {
            let cli = Cli::try_parse_from([
                "bingdaily",
                "--cache-dir",
                "/tmp/bing",
                "--market",
                "fr-FR",
                "--download-only",
            ])
            .unwrap();
            let app = BingDailyApp::new(&cli).unwrap();

            assert_eq!(app.options().config.cache_dir, PathBuf::from("/tmp/bing"));
            assert_eq!(app.options().provider.market(), Some("fr-FR"));
            assert!(app.options().download_only);
        }

        #[test]
        fn stages_name_each_error_kind() {
            assert_eq!(
                failure_stage(&RunError::Metadata(MetadataError::NoImages)),
                "metadata"
            );
            assert_eq!(
                failure_stage(&RunError::Download(DownloadError { failures: Vec::new() })),
                "download"
            );
            assert_eq!(
                failure_stage(&RunError::Apply(ApplyError::NonUtf8Path(PathBuf::from("x")))),
                "wallpaper"
            );
        }
    }
}

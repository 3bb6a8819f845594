// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process settings loaded from environment variables.

/// Log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";
/// Log filter when `RUST_LOG` is unset and `--verbose` is given.
const VERBOSE_LOG_FILTER: &str = "info,polybrick_packing=debug,polybrick_cli=debug";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads for parallel processing.
    pub worker_threads: usize,
    /// Seed used when neither the job nor the command line sets one.
    pub seed: Option<u64>,
    /// Explicit `RUST_LOG` filter.
    pub log_filter: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            worker_threads: std::env::var("POLYBRICK_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
            seed: std::env::var("POLYBRICK_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            log_filter: std::env::var("RUST_LOG").ok(),
        }
    }

    /// Apply command-line overrides.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        if let Some(threads) = threads.filter(|&t| t > 0) {
            self.worker_threads = threads;
        }
        self
    }

    /// Filter for the tracing subscriber.
    pub fn log_filter(&self, verbose: bool) -> String {
        match &self.log_filter {
            Some(filter) => filter.clone(),
            None if verbose => VERBOSE_LOG_FILTER.into(),
            None => DEFAULT_LOG_FILTER.into(),
        }
    }
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, ValueEnum};
use humantime::parse_duration;
use lro::{PolicyError, WaitPolicy};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

const DESCRIPTION: &str = concat!(
    "Waits for a long-running operation to complete.",
    " The operation is polled with truncated exponential backoff until it",
    " succeeds, fails, or the maximum wait time expires.",
    " Progress is shown on stderr, and the final resource is printed on stdout",
    " as JSON."
);

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
pub struct Args {
    /// The operation name, either relative
    /// (`projects/p/locations/l/operations/o`) or a full URI.
    pub operation: String,

    /// The service endpoint, e.g. `https://eventarc.googleapis.com`.
    #[arg(long, env = "CLOUDSDK_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// The API version used in request paths.
    #[arg(long, default_value = "v1")]
    pub api_version: String,

    /// The operations collection, optionally prefixed with the API name.
    #[arg(long, default_value = "projects.locations.operations")]
    pub collection: String,

    /// The progress message, defaults to `Waiting for operation [NAME] to complete`.
    #[arg(long)]
    pub message: Option<String>,

    /// How to produce the final resource.
    #[arg(long, value_enum, default_value_t = ResultMode::Embedded)]
    pub result: ResultMode,

    /// Print the operation name and return without waiting.
    #[arg(long = "async", default_value_t = false)]
    pub run_async: bool,

    #[arg(long, value_parser = parse_duration, default_value = "30m")]
    pub max_wait: Duration,

    #[arg(long, value_parser = parse_duration, default_value = "2s")]
    pub initial_delay: Duration,

    #[arg(long, default_value_t = 1.4)]
    pub backoff_multiplier: f64,

    #[arg(long, value_parser = parse_duration, default_value = "3m")]
    pub backoff_ceiling: Duration,

    /// The number of consecutive transient errors tolerated while polling.
    #[arg(long, default_value_t = 3)]
    pub transient_retries: u32,

    /// How long to wait before the first poll.
    #[arg(long, value_parser = parse_duration, default_value = "0s")]
    pub pre_start_delay: Duration,

    /// The timeout for each HTTP request. Polls never run past `--max-wait`,
    /// with or without this flag.
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    #[arg(long, env = "CLOUDSDK_AUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, value_enum, env = "CLOUDSDK_CORE_VERBOSITY", default_value_t = Verbosity::Warning)]
    pub verbosity: Verbosity,
}

impl Args {
    /// Builds the wait policy from the polling flags.
    pub fn wait_policy(&self) -> Result<WaitPolicy, PolicyError> {
        WaitPolicy::builder()
            .with_max_wait(self.max_wait)
            .with_initial_delay(self.initial_delay)
            .with_backoff_multiplier(self.backoff_multiplier)
            .with_backoff_ceiling(self.backoff_ceiling)
            .with_transient_retries(self.transient_retries)
            .with_pre_start_delay(self.pre_start_delay)
            .build()
    }

    /// The service endpoint.
    ///
    /// Defaults to the scheme and host of the operation name, if the name is
    /// a full URI.
    pub fn endpoint(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            let uri = url::Url::parse(&self.operation).ok()?;
            match uri.scheme() {
                "http" | "https" => Some(uri.origin().ascii_serialization()),
                _ => None,
            }
        })
    }

    /// The per-request timeout, never longer than the maximum wait.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
            .map(|t| std::cmp::min(t, self.max_wait))
            .filter(|t| !t.is_zero())
    }

    pub fn message(&self, operation: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("Waiting for operation [{operation}] to complete"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ResultMode {
    /// Do not produce a result.
    None,
    /// Print the response embedded in the operation.
    Embedded,
    /// Fetch the resource named by the operation.
    Fetch,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum Verbosity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    #[value(name = "none")]
    Off,
}

impl Verbosity {
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Critical => LevelFilter::ERROR,
            Self::Off => LevelFilter::OFF,
        }
    }
}

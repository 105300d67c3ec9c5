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

mod args;
mod client;

use anyhow::Result;
use args::{Args, ResultMode};
use clap::Parser;
use client::OperationsClient;
use gaxi::http::BuilderError;
use gaxi::options::ClientConfig;
use lro::progress::Tracker;
use lro::{
    Collection, ErrorCategory, OperationReference, OperationStatus, PolicyError, WaitPolicy,
    Waiter, fetcher,
};
use std::io::Write;
use std::process::ExitCode;

// Exit codes, `clap` uses 2 for usage errors.
const OPERATION_FAILED: u8 = 1;
const TIMEOUT: u8 = 3;
const CONNECTIVITY: u8 = 4;
const INVALID_INPUT: u8 = 5;
const INTERNAL: u8 = 6;

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = enable_tracing(&args);

    match run(&args, &mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let collection = Collection::new(args.collection.as_str());
    let reference = OperationReference::parse(
        &args.operation,
        &collection,
        Some(args.api_version.as_str()),
    )?;
    if args.run_async {
        writeln!(out, "{reference}")?;
        return Ok(());
    }

    let policy = args.wait_policy()?;
    let mut config = ClientConfig::new()
        .with_user_agent(concat!("cloudsdk-wait/", env!("CARGO_PKG_VERSION")));
    let endpoint = args.endpoint();
    if let Some(endpoint) = &endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(token) = &args.access_token {
        config = config.with_access_token(token);
    }
    if let Some(timeout) = args.request_timeout() {
        config = config.with_timeout(timeout);
    }
    let client = OperationsClient::new(config, args.api_version.as_str())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let message = args.message(&reference.relative_name());
    tracing::debug!(
        "Waiting for {reference} at {endpoint:?}, result={:?}",
        args.result
    );
    let result = runtime.block_on(wait(&client, &reference, &message, args.result, policy))?;
    if let Some(resource) = result {
        writeln!(out, "{}", serde_json::to_string_pretty(&resource)?)?;
    }
    Ok(())
}

async fn wait(
    client: &OperationsClient,
    reference: &OperationReference,
    message: &str,
    mode: ResultMode,
    policy: WaitPolicy,
) -> lro::Result<Option<serde_json::Value>> {
    let query = |reference: OperationReference| {
        let client = client.clone();
        async move { client.get_operation(reference).await }
    };
    match mode {
        ResultMode::None => {
            Waiter::new(query, fetcher::none::<serde_json::Value>())
                .with_policy(policy)
                .with_progress(Tracker::stderr())
                .wait_for(reference, message, false)
                .await
        }
        ResultMode::Embedded => {
            Waiter::new(query, fetcher::embedded::<serde_json::Value>())
                .with_policy(policy)
                .with_progress(Tracker::stderr())
                .wait_for(reference, message, true)
                .await
        }
        ResultMode::Fetch => {
            let fetch = |status: OperationStatus| {
                let client = client.clone();
                async move {
                    match fetcher::target_name(&status) {
                        None => Ok(None),
                        Some(name) => client.get_resource(name).await.map(Some),
                    }
                }
            };
            Waiter::new(query, fetch)
                .with_policy(policy)
                .with_progress(Tracker::stderr())
                .wait_for(reference, message, true)
                .await
        }
    }
}

fn error_message(error: &anyhow::Error) -> String {
    format!("ERROR: (cloudsdk-wait) {error}")
}

fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(e) = error.downcast_ref::<lro::Error>() {
        return match e.category() {
            ErrorCategory::OperationFailed => OPERATION_FAILED,
            ErrorCategory::Timeout => TIMEOUT,
            ErrorCategory::Connectivity => CONNECTIVITY,
            ErrorCategory::InvalidInput => INVALID_INPUT,
            _ => INTERNAL,
        };
    }
    if error.is::<PolicyError>() {
        return INVALID_INPUT;
    }
    match error.downcast_ref::<BuilderError>() {
        Some(BuilderError::Transport(_)) | None => INTERNAL,
        Some(_) => INVALID_INPUT,
    }
}

fn enable_tracing(args: &Args) -> tracing::dispatcher::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_max_level(args.verbosity.level())
        .finish();

    tracing::subscriber::set_default(subscriber)
}

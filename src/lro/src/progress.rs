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

//! Report the progress of a wait.

use crate::error::{Error, ErrorCategory};
use crate::reference::OperationReference;
use crate::status::OperationStatus;
use std::io::Write;

/// How a wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Failed,
    TimedOut,
}

impl From<&Error> for Outcome {
    fn from(value: &Error) -> Self {
        match value.category() {
            ErrorCategory::Timeout => Self::TimedOut,
            _ => Self::Failed,
        }
    }
}

/// Receives progress events while waiting for an operation.
pub trait Progress: Send {
    /// Called once, before the first poll.
    fn start(&mut self, message: &str, reference: &OperationReference);

    /// Called after each poll that finds the operation still in progress.
    fn tick(&mut self, status: &OperationStatus);

    /// Called once, when the wait ends.
    fn finish(&mut self, outcome: Outcome);
}

/// A [Progress] implementation that discards all events.
#[derive(Clone, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _message: &str, _reference: &OperationReference) {}
    fn tick(&mut self, _status: &OperationStatus) {}
    fn finish(&mut self, _outcome: Outcome) {}
}

/// Prints progress to a status stream, typically `stderr`.
///
/// The output looks like:
///
/// ```text
/// Waiting for operation [projects/p/locations/l/operations/o] to complete.....done.
/// ```
///
/// The status stream is informational. Errors writing to it are ignored, they
/// should not abort the wait.
#[derive(Debug)]
pub struct Tracker<W> {
    out: W,
}

impl<W: Write + Send> Tracker<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let _ = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
    }
}

impl Tracker<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> Progress for Tracker<W> {
    fn start(&mut self, message: &str, _reference: &OperationReference) {
        self.emit(&format!("{message}..."));
    }

    fn tick(&mut self, _status: &OperationStatus) {
        self.emit(".");
    }

    fn finish(&mut self, outcome: Outcome) {
        let text = match outcome {
            Outcome::Done => "done.\n",
            Outcome::Failed => "failed.\n",
            Outcome::TimedOut => "timed out.\n",
        };
        self.emit(text);
    }
}

// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The loader state machine.
//!
//! ```text
//! Idle -> Fetching -> Compiling -> Instantiated#1 -> Running -> Completed -> Instantiated#2
//!            |            |              |              |           |
//!            +------------+--------------+--------------+-----------+--> Failed
//! ```

use std::fmt;

use wasmboot_error::{Error, Result};

/// States a load passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderState {
    /// Nothing has happened yet
    Idle,
    /// The resource is being retrieved
    Fetching,
    /// Bytes are being validated and compiled
    Compiling,
    /// The first instance exists and has not run
    Instantiated1,
    /// The entry point is executing
    Running,
    /// The entry point signalled completion
    Completed,
    /// The second instance exists; terminal
    Instantiated2,
    /// The load failed; terminal
    Failed,
}

impl LoaderState {
    /// Display name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Fetching => "Fetching",
            Self::Compiling => "Compiling",
            Self::Instantiated1 => "Instantiated#1",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Instantiated2 => "Instantiated#2",
            Self::Failed => "Failed",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Instantiated2 | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching)
                | (Self::Fetching, Self::Compiling)
                | (Self::Compiling, Self::Instantiated1)
                | (Self::Instantiated1, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Completed, Self::Instantiated2)
                | (
                    Self::Fetching
                        | Self::Compiling
                        | Self::Instantiated1
                        | Self::Running
                        | Self::Completed,
                    Self::Failed
                )
        )
    }
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sequence of states the Idle -> Instantiated#2 path takes
pub const SUCCESS_PATH: [LoaderState; 7] = [
    LoaderState::Idle,
    LoaderState::Fetching,
    LoaderState::Compiling,
    LoaderState::Instantiated1,
    LoaderState::Running,
    LoaderState::Completed,
    LoaderState::Instantiated2,
];

/// Validates and records state transitions of one load
#[derive(Debug, Clone)]
pub struct StateTracker {
    history: Vec<LoaderState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    /// A tracker in [`LoaderState::Idle`]
    #[must_use]
    pub fn new() -> Self {
        Self { history: vec![LoaderState::Idle] }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LoaderState {
        self.history.last().copied().unwrap_or(LoaderState::Idle)
    }

    /// Every state entered, starting with `Idle`
    #[must_use]
    pub fn history(&self) -> &[LoaderState] {
        &self.history
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error if the transition is not allowed
    pub fn transition(&mut self, next: LoaderState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(Error::invalid_state(format!(
                "illegal loader transition {current} -> {next}"
            )));
        }
        tracing::debug!(from = %current, to = %next, "Loader state transition");
        self.history.push(next);
        Ok(())
    }

    /// Move to [`LoaderState::Failed`] unless already terminal
    ///
    /// Returns whether the state changed.
    pub fn fail(&mut self) -> bool {
        self.transition(LoaderState::Failed).is_ok()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lifecycle state machine for heavyweight engine handles (OCR models,
// language-model clients).
//
// Transitions are a closed table: anything not listed is rejected with a
// `LifecycleError` rather than silently accepted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a handle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Constructed (or finished a unit of work) and ready.
    Idle,
    /// Model loading in progress.
    Initializing,
    /// Running inference.
    Processing,
    /// Initialization failed; the handle will not be used again.
    Error,
    /// Released; terminal.
    Shutdown,
}

/// Inputs that drive a [`HandleState`] transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleEvent {
    BeginInit,
    InitSucceeded,
    InitFailed,
    BeginWork,
    WorkFinished,
    /// A single unit of work failed. The handle stays usable.
    WorkFailed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition: {event:?} while {state:?}")]
pub struct LifecycleError {
    pub state: HandleState,
    pub event: HandleEvent,
}

impl HandleState {
    /// Apply `event`, returning the next state or the rejected pair.
    pub fn transition(self, event: HandleEvent) -> Result<HandleState, LifecycleError> {
        use HandleEvent as E;
        use HandleState as S;

        let next = match (self, event) {
            (S::Idle, E::BeginInit) => S::Initializing,
            (S::Initializing, E::InitSucceeded) => S::Idle,
            (S::Initializing, E::InitFailed) => S::Error,
            (S::Idle, E::BeginWork) => S::Processing,
            (S::Processing, E::WorkFinished) => S::Idle,
            (S::Processing, E::WorkFailed) => S::Idle,
            (S::Idle | S::Error, E::Shutdown) => S::Shutdown,
            (state, event) => return Err(LifecycleError { state, event }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let state = HandleState::Idle
            .transition(HandleEvent::BeginInit)
            .and_then(|s| s.transition(HandleEvent::InitSucceeded))
            .and_then(|s| s.transition(HandleEvent::BeginWork))
            .and_then(|s| s.transition(HandleEvent::WorkFinished))
            .and_then(|s| s.transition(HandleEvent::Shutdown))
            .unwrap();
        assert_eq!(state, HandleState::Shutdown);
    }

    #[test]
    fn failed_init_is_terminal_for_work() {
        let state = HandleState::Idle
            .transition(HandleEvent::BeginInit)
            .and_then(|s| s.transition(HandleEvent::InitFailed))
            .unwrap();
        assert_eq!(state, HandleState::Error);
        assert!(state.transition(HandleEvent::BeginWork).is_err());
    }

    #[test]
    fn work_failure_returns_to_idle() {
        let state = HandleState::Processing
            .transition(HandleEvent::WorkFailed)
            .unwrap();
        assert_eq!(state, HandleState::Idle);
    }

    #[test]
    fn shutdown_rejects_everything() {
        for event in [
            HandleEvent::BeginInit,
            HandleEvent::BeginWork,
            HandleEvent::Shutdown,
        ] {
            let err = HandleState::Shutdown.transition(event).unwrap_err();
            assert_eq!(err.state, HandleState::Shutdown);
        }
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared, lazily-initialized engine handles.
//
// Loading OCR models is expensive, so a handle holds a factory and builds the
// engine on first use. Concurrent first callers block on the same
// initialization; a failure is cached and reported on every later call
// instead of being retried per request. Inference into one engine is
// serialized with a `Mutex`; a panicking engine fails only its own call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use docverify_core::error::{DocVerifyError, Result};
use docverify_core::lifecycle::{HandleEvent, HandleState};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::engine::{EngineOutput, RecognitionEngine};

type EngineFactory = Box<dyn Fn() -> Result<Box<dyn RecognitionEngine>> + Send + Sync>;

/// What an engine returned for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// The engine reported its own scores.
    Native(EngineOutput),
    /// Plain text only; the caller estimates confidence.
    Text(String),
}

/// A named engine that is loaded at most once and shared via `Arc`.
pub struct EngineHandle {
    name: String,
    factory: EngineFactory,
    /// Cached engine, or the message of the failed initialization.
    engine: OnceCell<std::result::Result<Mutex<Box<dyn RecognitionEngine>>, String>>,
    state: Mutex<HandleState>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    // -- Construction ---------------------------------------------------------

    /// Create a handle that builds its engine with `factory` on first use.
    pub fn lazy<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn RecognitionEngine>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            engine: OnceCell::new(),
            state: Mutex::new(HandleState::Idle),
        }
    }

    /// Wrap an engine that is already constructed.
    pub fn ready(engine: impl RecognitionEngine + 'static) -> Self {
        let name = engine.name().to_string();
        let boxed: Box<dyn RecognitionEngine> = Box::new(engine);
        let cell = OnceCell::new();
        // Freshly created cell; `set` cannot fail.
        let _ = cell.set(Ok(Mutex::new(boxed)));
        Self {
            name,
            factory: Box::new(|| {
                Err(DocVerifyError::EngineUnavailable(
                    "engine was supplied pre-built".into(),
                ))
            }),
            engine: cell,
            state: Mutex::new(HandleState::Idle),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state. A poisoned state lock reads as `Error`.
    pub fn state(&self) -> HandleState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(HandleState::Error)
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Release the handle. Later calls fail with a lifecycle error.
    pub fn shutdown(&self) -> Result<()> {
        self.advance(HandleEvent::Shutdown)?;
        info!(engine = %self.name, "Engine handle shut down");
        Ok(())
    }

    /// Run the engine on one image.
    #[instrument(skip(self, image), fields(engine = %self.name, width = image.width(), height = image.height()))]
    pub fn recognize(&self, image: &DynamicImage) -> Result<Recognition> {
        let engine = self.engine()?;
        // Panics are caught below, so a poisoned lock still guards a usable engine.
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);

        self.advance(HandleEvent::BeginWork)?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_engine(&mut **engine, image)))
            .unwrap_or_else(|payload| {
                Err(DocVerifyError::Recognition(format!(
                    "{} engine panicked: {}",
                    self.name,
                    panic_message(payload.as_ref())
                )))
            });
        let event = if outcome.is_ok() {
            HandleEvent::WorkFinished
        } else {
            HandleEvent::WorkFailed
        };
        self.advance(event)?;

        if let Err(err) = &outcome {
            warn!(engine = %self.name, error = %err, "Recognition failed");
        }
        outcome
    }

    // -- Internals ------------------------------------------------------------

    fn engine(&self) -> Result<&Mutex<Box<dyn RecognitionEngine>>> {
        match self.engine.get_or_init(|| self.initialize()) {
            Ok(engine) => Ok(engine),
            Err(message) => Err(DocVerifyError::EngineUnavailable(message.clone())),
        }
    }

    fn initialize(&self) -> std::result::Result<Mutex<Box<dyn RecognitionEngine>>, String> {
        if let Err(err) = self.advance(HandleEvent::BeginInit) {
            return Err(format!("{}: {}", self.name, err));
        }
        info!(engine = %self.name, "Loading recognition engine (first use)");

        match (self.factory)() {
            Ok(engine) => {
                self.advance(HandleEvent::InitSucceeded)
                    .map_err(|err| format!("{}: {}", self.name, err))?;
                info!(engine = %self.name, "Recognition engine ready");
                Ok(Mutex::new(engine))
            }
            Err(err) => {
                // The original failure is what callers need to see.
                let _ = self.advance(HandleEvent::InitFailed);
                warn!(engine = %self.name, error = %err, "Recognition engine failed to load");
                Err(format!("{}: {}", self.name, err))
            }
        }
    }

    fn advance(&self, event: HandleEvent) -> Result<()> {
        let mut state = self.state.lock().map_err(|err| {
            DocVerifyError::EngineUnavailable(format!("{} state lock poisoned: {}", self.name, err))
        })?;
        let next = state.transition(event)?;
        debug!(engine = %self.name, from = ?*state, to = ?next, "Handle state change");
        *state = next;
        Ok(())
    }
}

fn run_engine(engine: &mut dyn RecognitionEngine, image: &DynamicImage) -> Result<Recognition> {
    if let Some(output) = engine.extract_with_confidence(image)? {
        return Ok(Recognition::Native(output));
    }
    engine.extract(image).map(Recognition::Text)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

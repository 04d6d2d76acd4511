// THEORY:
// The digit model is an external artifact that has to be fetched and initialized
// before the first prediction. The page used to learn about this through a
// fire-once callback and a pair of boolean flags. `Readiness` replaces that with an
// explicit lifecycle:
//
//     Loading ──> Ready
//        └──────> Failed(reason)
//
// Exactly one transition ever happens. Later attempts to move the state are
// ignored, so a late or duplicated ready signal cannot flip a failed model back to
// usable. Observers can poll `state()` or await `wait_ready()`. The site does
// both: its drawing page and predict endpoint check `state()` per request (a
// loading indicator and a 503 until `Ready`), and a startup task awaits
// `wait_ready()` to log when the surface becomes available.

use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Loading,
    Ready,
    Failed(String),
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Loading => write!(f, "loading"),
            ModelState::Ready => write!(f, "ready"),
            ModelState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A single-transition `Loading -> Ready | Failed` cell that can be awaited.
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<ModelState>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ModelState::Loading);
        Self { tx }
    }

    pub fn state(&self) -> ModelState {
        self.tx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.tx.borrow(), ModelState::Ready)
    }

    /// Moves `Loading -> Ready`. Returns false if the state had already settled.
    pub fn mark_ready(&self) -> bool {
        self.settle(ModelState::Ready)
    }

    /// Moves `Loading -> Failed`. Returns false if the state had already settled.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        self.settle(ModelState::Failed(reason.into()))
    }

    fn settle(&self, next: ModelState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ModelState::Loading {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once the state leaves `Loading`, with `Ok` only for `Ready`.
    pub async fn wait_ready(&self) -> Result<(), String> {
        let mut rx = self.tx.subscribe();
        let settled = rx
            .wait_for(|state| *state != ModelState::Loading)
            .await
            .map_err(|_| "readiness channel closed".to_string())?;
        match &*settled {
            ModelState::Ready => Ok(()),
            ModelState::Failed(reason) => Err(reason.clone()),
            ModelState::Loading => Err("still loading".to_string()),
        }
    }
}

//! Live accuracy tracking from ground truth reported after serving.
//!
//! Each served prediction gets a short request id and is parked in a
//! [`PendingPredictions`] store. When the ground truth for that id arrives
//! the prediction is taken out of the store and scored. Ids that are unknown
//! or already scored are ignored.
//!
//! Ground truth may never arrive, so the in-memory store is bounded: once it
//! holds [`DEFAULT_PENDING_CAPACITY`] predictions (or the capacity given to
//! [`InMemoryPendingPredictions::with_capacity`]), parking another one evicts
//! the oldest. Feedback for an evicted id is then ignored like any unknown id.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tictac_engine::GameState;
use uuid::Uuid;

use crate::{classifier::ModelKind, pipeline::Classification};

/// Hex digits in a request id.
pub const REQUEST_ID_LEN: usize = 6;

/// Fresh ids drawn for one prediction before giving up.
pub const MAX_ID_ATTEMPTS: usize = 64;

pub const DEFAULT_PENDING_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("no free request id after {attempts} attempts ({pending} predictions pending)")]
pub struct RecordError {
    pub attempts: usize,
    pub pending: usize,
}

/// Storage for predictions awaiting ground truth.
pub trait PendingPredictions {
    /// Parks `prediction`, returning the id of a prediction evicted to make
    /// room, if any.
    fn insert(&mut self, request_id: String, prediction: Classification) -> Option<String>;
    fn take(&mut self, request_id: &str) -> Option<Classification>;
    fn get(&self, request_id: &str) -> Option<&Classification>;
    fn len(&self) -> usize;

    fn contains(&self, request_id: &str) -> bool {
        self.get(request_id).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bounded store that evicts the oldest pending prediction when full.
#[derive(Debug, Clone)]
pub struct InMemoryPendingPredictions {
    capacity: usize,
    entries: HashMap<String, Classification>,
    order: VecDeque<String>,
}

impl Default for InMemoryPendingPredictions {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PENDING_CAPACITY)
    }
}

impl InMemoryPendingPredictions {
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn forget(&mut self, request_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == request_id) {
            self.order.remove(pos);
        }
    }
}

impl PendingPredictions for InMemoryPendingPredictions {
    fn insert(&mut self, request_id: String, prediction: Classification) -> Option<String> {
        if self.entries.insert(request_id.clone(), prediction).is_some() {
            self.forget(&request_id);
            self.order.push_back(request_id);
            return None;
        }
        self.order.push_back(request_id);
        if self.order.len() <= self.capacity {
            return None;
        }
        let evicted = self.order.pop_front()?;
        self.entries.remove(&evicted);
        Some(evicted)
    }

    fn take(&mut self, request_id: &str) -> Option<Classification> {
        let prediction = self.entries.remove(request_id)?;
        self.forget(request_id);
        Some(prediction)
    }

    fn get(&self, request_id: &str) -> Option<&Classification> {
        self.entries.get(request_id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Hit / miss counters over scored predictions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackCounts {
    pub n: usize,
    pub hits: usize,
    pub misses: usize,
}

impl FeedbackCounts {
    /// `hits / n`, or `0.0` before anything was scored.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.hits as f64 / self.n as f64
        }
    }
}

#[derive(Debug)]
pub struct FeedbackTracker<S> {
    store: S,
    counts: FeedbackCounts,
    per_model: HashMap<ModelKind, FeedbackCounts>,
}

impl<S> FeedbackTracker<S>
where
    S: PendingPredictions,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            counts: FeedbackCounts::default(),
            per_model: HashMap::new(),
        }
    }

    /// Parks `prediction` and returns its request id.
    ///
    /// The id is the leading hex digits of a random UUID. An id that is
    /// already pending is redrawn, at most [`MAX_ID_ATTEMPTS`] times.
    pub fn record(&mut self, prediction: Classification) -> Result<String, RecordError> {
        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| {
                let mut id = Uuid::new_v4().simple().to_string();
                id.truncate(REQUEST_ID_LEN);
                id
            })
            .find(|id| !self.store.contains(id))
            .ok_or_else(|| RecordError {
                attempts: MAX_ID_ATTEMPTS,
                pending: self.store.len(),
            })?;
        if let Some(evicted) = self.store.insert(id.clone(), prediction) {
            tracing::debug!(request_id = %evicted, "evicted oldest pending prediction");
        }
        Ok(id)
    }

    /// Scores the prediction behind `request_id`.
    ///
    /// Returns the prediction if the id was pending; unknown ids change
    /// nothing.
    pub fn log_ground_truth(&mut self, request_id: &str, correct: bool) -> Option<Classification> {
        let Some(prediction) = self.store.take(request_id) else {
            tracing::debug!(request_id, "ground truth for unknown request ignored");
            return None;
        };
        for counts in [
            &mut self.counts,
            self.per_model.entry(prediction.model).or_default(),
        ] {
            counts.n += 1;
            if correct {
                counts.hits += 1;
            } else {
                counts.misses += 1;
            }
        }
        Some(prediction)
    }

    /// Like [`Self::log_ground_truth`], judging correctness against `actual`.
    pub fn log_actual(&mut self, request_id: &str, actual: GameState) -> Option<Classification> {
        let correct = self.store.get(request_id)?.prediction == actual;
        self.log_ground_truth(request_id, correct)
    }

    #[must_use]
    pub fn counts(&self) -> FeedbackCounts {
        self.counts
    }

    #[must_use]
    pub fn model_counts(&self, model: ModelKind) -> FeedbackCounts {
        self.per_model.get(&model).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.store.len()
    }
}

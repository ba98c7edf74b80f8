//! Trigger Evaluator
//!
//! Holds one `TriggerBook` per instrument behind its own lock. Ticks for
//! different instruments evaluate in parallel; ticks for the same instrument
//! apply one after another. Dispatch from instrument to book is a hash
//! lookup, never a scan.
//!
//! The evaluator only reports what fired and what moved. Applying that to
//! the order groups is the coordinator's job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::shared::{GroupId, InstrumentId, LegId, Timestamp};
use crate::domain::triggers::{
    Tick, TickEvaluation, TriggerBook, TriggerCondition, TriggerEvaluationError,
};
use crate::observability::set_registered_triggers;

/// Instrument-indexed set of armed trigger conditions.
#[derive(Debug)]
pub struct TriggerEvaluator {
    books: RwLock<HashMap<InstrumentId, Arc<Mutex<TriggerBook>>>>,
    leg_index: RwLock<HashMap<LegId, InstrumentId>>,
    max_tick_age: chrono::Duration,
}

impl TriggerEvaluator {
    /// Create an evaluator that refuses ticks older than `max_tick_age`
    /// (zero disables the age check).
    #[must_use]
    pub fn new(max_tick_age: chrono::Duration) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            leg_index: RwLock::new(HashMap::new()),
            max_tick_age,
        }
    }

    /// Arm a condition.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the leg is armed on any instrument, or
    /// `InvalidCondition` for a malformed condition.
    pub fn register(&self, condition: TriggerCondition) -> Result<(), TriggerEvaluationError> {
        if self.is_registered(&condition.leg_id) {
            return Err(TriggerEvaluationError::AlreadyRegistered {
                leg_id: condition.leg_id,
            });
        }

        let leg_id = condition.leg_id.clone();
        let instrument = condition.instrument.clone();
        let book = self.book_for(&instrument);
        book.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(condition)?;

        self.leg_index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(leg_id.clone(), instrument.clone());
        self.publish_count();
        tracing::debug!(leg_id = %leg_id, instrument = %instrument, "Trigger armed");
        Ok(())
    }

    /// Disarm the trigger for a leg.
    pub fn deregister(&self, leg_id: &LegId) -> Option<TriggerCondition> {
        let instrument = self
            .leg_index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(leg_id)?;
        let book = self.existing_book(&instrument)?;
        let removed = book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deregister(leg_id);
        self.publish_count();
        removed
    }

    /// Disarm every trigger of a group.
    pub fn deregister_group(&self, group_id: &GroupId) -> Vec<LegId> {
        let books: Vec<Arc<Mutex<TriggerBook>>> = self
            .books
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut removed = Vec::new();
        for book in books {
            removed.extend(
                book.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .deregister_group(group_id),
            );
        }
        self.forget(&removed);
        removed
    }

    /// Evaluate a tick against the book for its instrument.
    ///
    /// # Errors
    ///
    /// Returns error for a non-positive or stale tick; armed triggers are
    /// left untouched.
    pub fn on_tick(&self, tick: &Tick) -> Result<TickEvaluation, TriggerEvaluationError> {
        tick.validate(Timestamp::now(), self.max_tick_age)?;

        let Some(book) = self.existing_book(&tick.instrument) else {
            return Ok(TickEvaluation::default());
        };
        let evaluation = book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .evaluate(tick);

        if !evaluation.fired.is_empty() {
            let done: Vec<LegId> = evaluation
                .fired
                .iter()
                .flat_map(|f| std::iter::once(f.leg_id.clone()).chain(f.withdrawn_sibling.clone()))
                .collect();
            self.forget(&done);
        }
        Ok(evaluation)
    }

    /// Returns true if the leg has an armed trigger.
    #[must_use]
    pub fn is_registered(&self, leg_id: &LegId) -> bool {
        self.leg_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(leg_id)
    }

    /// Armed condition for a leg.
    #[must_use]
    pub fn condition(&self, leg_id: &LegId) -> Option<TriggerCondition> {
        let instrument = self
            .leg_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(leg_id)
            .cloned()?;
        let book = self.existing_book(&instrument)?;
        let guard = book.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(leg_id).cloned()
    }

    /// Number of armed triggers.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.leg_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Instruments with at least one armed trigger.
    #[must_use]
    pub fn armed_instruments(&self) -> Vec<InstrumentId> {
        self.books
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, book)| !book.lock().unwrap_or_else(PoisonError::into_inner).is_empty())
            .map(|(instrument, _)| instrument.clone())
            .collect()
    }

    fn book_for(&self, instrument: &InstrumentId) -> Arc<Mutex<TriggerBook>> {
        if let Some(book) = self.existing_book(instrument) {
            return book;
        }
        let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            books
                .entry(instrument.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TriggerBook::new(instrument.clone())))),
        )
    }

    fn existing_book(&self, instrument: &InstrumentId) -> Option<Arc<Mutex<TriggerBook>>> {
        self.books
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(instrument)
            .cloned()
    }

    fn forget(&self, legs: &[LegId]) {
        if legs.is_empty() {
            return;
        }
        let mut index = self.leg_index.write().unwrap_or_else(PoisonError::into_inner);
        for leg in legs {
            index.remove(leg);
        }
        let count = index.len();
        drop(index);
        set_registered_triggers(count);
    }

    fn publish_count(&self) {
        set_registered_triggers(self.registered_count());
    }
}

impl Default for TriggerEvaluator {
    fn default() -> Self {
        Self::new(chrono::Duration::seconds(5))
    }
}

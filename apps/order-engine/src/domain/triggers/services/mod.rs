//! Trigger domain services.

mod trigger_book;

pub use trigger_book::TriggerBook;

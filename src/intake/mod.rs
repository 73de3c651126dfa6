//! Daily intake accounting. [tracker::IntakeTracker] is the only owner of today's amount and
//! writes it through [crate::storage::history::HistoryStorage].

pub mod tracker;

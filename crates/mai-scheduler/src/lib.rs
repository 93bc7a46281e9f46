//! Schedule search (C9) and the reminder sweep (C10). Both modules only ever
//! read schedule data through [`mai_memory::MemoryStore`] — C3 keeps sole
//! ownership of persistence even though the search/reminder logic lives here.

pub mod reminder;
pub mod search;

pub use reminder::{due_reminders, run_sweep, DueReminder};
pub use search::{search, ScoredEvent};

#[cfg(feature = "subscriber")]
mod view;
#[cfg(feature = "subscriber")]
pub use view::{log_event, message_for};

#[cfg(feature = "subscriber")]
mod journal;
#[cfg(feature = "subscriber")]
pub use journal::{DEFAULT_JOURNAL_QUEUE, Journal};

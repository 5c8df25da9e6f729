pub mod enroll;
pub mod processor;

pub use enroll::enroll_recipient;
pub use processor::{process_queue_item, ItemOutcome};

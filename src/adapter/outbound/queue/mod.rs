//! Manual queue backends.

mod ledger;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlQueueStore;
pub use memory::MemoryQueueStore;

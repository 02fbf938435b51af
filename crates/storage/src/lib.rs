// MODULE DECLARATIONS
// These files exist internally but we decide what to expose below.
mod codec;
mod column;
mod disk;

// PUBLIC API EXPORTS
// Users of this crate (the index layer and the main binary) access these directly.
pub use codec::{FixedWidth, FIXED_STRING_LEN};
pub use column::{ColumnFile, RecordId};
pub use disk::{BlockFile, BlockOffset, StorageError, StorageResult, BLOCK_SIZE, NO_OFFSET};

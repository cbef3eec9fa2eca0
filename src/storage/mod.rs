//! Photo persistence through the shared media store.
//!
//! The store owns the files; this module reserves entries, streams the
//! encoded picture into them and cleans up entries that never completed.

mod fs_store;
mod memory;
mod record;
mod writer;

pub use fs_store::FsMediaStore;
pub use memory::MemoryMediaStore;
pub use record::{MediaStore, MediaUri, PhotoMetadata, PhotoRecord, JPEG_MIME};
pub use writer::{CaptureError, PhotoWriter};

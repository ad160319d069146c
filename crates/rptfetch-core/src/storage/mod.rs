//! Disk I/O and file lifecycle.
//!
//! Downloads stream into `<name>.part` and are renamed to the final name only
//! after the whole body was written and synced, so a file under its final
//! name is always complete.

mod writer;

pub use writer::StorageWriter;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.zip` → `a.zip.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

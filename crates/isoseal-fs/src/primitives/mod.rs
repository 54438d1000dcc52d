pub mod atomic_write;
pub mod hardlink;
pub mod replace_dir;

pub use atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use hardlink::hardlink_or_copy;
pub use replace_dir::{ReplaceDirOptions, replace_dir};

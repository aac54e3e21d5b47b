mod lock;
pub use lock::*;

#[cfg(unix)]
#[path = "imp_unix.rs"]
mod imp;

#[cfg(not(unix))]
#[path = "imp_default.rs"]
mod imp;

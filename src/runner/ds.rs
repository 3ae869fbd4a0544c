//! Runtime data structures shared by the registry, the compiler and the VM.

pub mod error;
pub mod native;
pub mod value;

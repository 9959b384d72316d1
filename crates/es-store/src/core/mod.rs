//! Core storage traits.
//!
//! ```text
//! ItemStorage
//!     └── MultiGetStorage
//! ```

pub mod storage;

pub use storage::{ItemStorage, MultiGetStorage};

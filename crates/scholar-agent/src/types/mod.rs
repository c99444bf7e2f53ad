//! Core types for the scholar pipeline

pub mod paper;
pub mod task;

pub use paper::{PaperMeta, PaperStatus, ResultKind};
pub use task::{TaskSnapshot, TaskStatus};

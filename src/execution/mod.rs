//! Order execution collaborators

pub mod paper;

pub use paper::{PaperAccount, PaperOrderExecutor};

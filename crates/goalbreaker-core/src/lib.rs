//! Goal decomposition: the generation client and the workflows that persist
//! its output.

pub mod error;
pub mod generation;
pub mod workflow;

pub use error::WorkflowError;

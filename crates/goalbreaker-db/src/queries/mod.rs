pub mod goals;
pub mod tasks;

pub mod rest;

pub use rest::{history_handler, roll_handler};

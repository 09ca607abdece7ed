pub mod output;
pub mod runner;

pub use output::*;
pub use runner::*;

pub mod insights;
pub mod record;
pub mod report;
pub mod segment;

pub use insights::*;
pub use record::*;
pub use report::*;
pub use segment::*;

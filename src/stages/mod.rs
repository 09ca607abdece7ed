pub mod stage0_segment;
pub mod stage1_analyze;
pub mod stage2_normalize;
pub mod stage3_render;

pub use stage0_segment::*;
pub use stage1_analyze::*;
pub use stage2_normalize::*;
pub use stage3_render::*;

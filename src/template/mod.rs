//! Template storage and planning utilities.

mod plan;

pub use plan::{TemplatePlan, CHANNELS};

mod disruption;

pub use disruption::{Disruption, PriorityLevel};

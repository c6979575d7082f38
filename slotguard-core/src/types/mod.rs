mod lease;
mod primitives;
mod schedule;

pub use lease::*;
pub use primitives::*;
pub use schedule::*;

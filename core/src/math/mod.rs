pub mod filter;
pub mod geometry;
pub mod integrate;
pub mod interp;
pub mod stats;

pub use geometry::{AnodePlane, BoundingBox};
pub use interp::{InverseCdf, RangeMap};
pub use stats::StatsHelper;

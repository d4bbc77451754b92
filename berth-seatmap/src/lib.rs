pub mod model;
pub mod registry;

pub use model::{Area, Seat, SeatMap};
pub use registry::{SeatMapError, SeatMapRegistry};

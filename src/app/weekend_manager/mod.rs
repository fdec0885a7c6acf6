pub mod controller;
pub mod params;

pub use controller::{Response, WeekendManagerReportsController};

pub mod natives;
pub mod planner;

pub use natives::extract_natives;
pub use planner::{LibraryPlan, LibraryPlanner, PlannedLibrary};

pub mod asset_index;
pub mod materialize;

pub use asset_index::{AssetIndex, AssetObject, AssetPlanner, RESOURCES_URL};
pub use materialize::materialize_virtual;

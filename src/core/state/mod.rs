pub mod layout;
pub mod settings;

pub use layout::GameLayout;
pub use settings::InstallerSettings;

pub mod orchestrator;
pub mod receipt;

pub use orchestrator::{
    cleanup_installation, InstallRequest, InstallServices, InstallStage, InstallationOrchestrator,
};
pub use receipt::InstallReceipt;

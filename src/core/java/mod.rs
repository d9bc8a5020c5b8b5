pub mod resolver;
pub mod runtime;

pub use resolver::{JavaResolver, LocalJavaResolver};
pub use runtime::{
    is_java_compatible_major, probe_java, required_java_for_minecraft_version, JavaInstallation,
};

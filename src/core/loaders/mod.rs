pub mod placeholders;
pub mod processor;
pub mod profile;

#[cfg(test)]
pub(crate) mod testing;

pub use placeholders::{PlaceholderEnv, PlaceholderTable, CLIENT_SIDE};
pub use processor::{read_main_class_from_jar, ProcessorReport, ProcessorRunner, ProcessorStage};
pub use profile::{DataValue, LoaderProfile, LoaderType, Processor};

pub mod process;

pub use process::{
    get_classpath_separator, ProcessLauncher, ProcessOutput, ProcessRequest, TokioProcessLauncher,
};

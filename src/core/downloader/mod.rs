pub mod cancel;
pub mod client;
pub mod progress;
pub mod transport;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancelFlag;
pub use client::{BatchReport, DownloadOutcome, DownloadTask, Downloader};
pub use progress::{
    CategoryState, DownloadState, NullProgress, ProgressCategory, ProgressSink, ProgressTracker,
    ProgressUpdate,
};
pub use transport::{ByteStream, ReqwestTransport, Transport};
pub use verify::{sha1_file, verify_sha1};

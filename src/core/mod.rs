// ─── GameSync Core ───
// Installation and asset-sync engine for versioned game distributions.
//
// Architecture:
//   core/
//     platform/  : OS/arch identity and manifest identifiers
//     version/   : Version JSON model + platform rule evaluation
//     maven/     : Coordinate parsing and library path resolution
//     downloader/: Bounded-concurrency downloads with SHA-1 validation
//     libraries/ : Library/native planning + natives extraction
//     assets/    : Asset index planning and content-addressed objects
//     loaders/   : Loader profiles, placeholders, processor runner
//     java/      : Java runtime resolution
//     launch/    : External process execution
//     install/   : Installation orchestrator + receipt
//     state/     : Settings and filesystem layout

pub mod assets;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod java;
pub mod launch;
pub mod libraries;
pub mod loaders;
pub mod maven;
pub mod platform;
pub mod state;
pub mod version;

pub mod config;
pub mod index;
pub mod reachability;
pub mod samples;
pub mod coverage;
pub mod formatter;

pub use config::Config;
pub use index::{ApiIndex, InterfaceApi, ModuleApi, OperationApi, RecordApi};
pub use reachability::{ClientSurface, ReachabilityAnalysis, ReachabilityAnalyzer};
pub use samples::{RustSampleWalker, SampleFile, SampleTree};
pub use coverage::{UsageCoverageEngine, UsageCoverageReport};
pub use formatter::SurfaceFormatter;

#[cfg(test)]
pub mod tests;

pub mod engine;
pub mod report;
pub mod resolution;

pub use engine::UsageCoverageEngine;
pub use report::{CoveredOperation, UncoveredOperation, UsageCoverageReport};
pub use resolution::{normalize_type_text, FileTypeResolver, ResolutionTables};

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::config::PerformanceConfig;
use crate::coverage::report::{CoveredOperation, UncoveredOperation, UsageCoverageReport};
use crate::coverage::resolution::{FileTypeResolver, ResolutionTables};
use crate::index::ApiIndex;
use crate::reachability::ClientSurface;
use crate::samples::model::{SampleFile, SampleTree};

/// Attributes sample call sites to client operations and partitions the
/// client operation map into covered and uncovered.
///
/// Pure function of its inputs: no I/O, no state kept between runs. Per-file
/// analysis is independent, so files fan out across threads and the results
/// are merged sequentially in enumeration order — the first-occurrence dedup
/// is defined against that order, not thread completion order.
pub struct UsageCoverageEngine {
    max_threads: usize,
    parallel: bool,
}

impl UsageCoverageEngine {
    pub fn new(performance: &PerformanceConfig) -> Self {
        Self {
            max_threads: performance.max_threads.max(1),
            parallel: performance.parallel,
        }
    }

    pub fn analyze(
        &self,
        tree: &SampleTree,
        index: &ApiIndex,
        surface: &ClientSurface,
    ) -> UsageCoverageReport {
        // No reachable operation holders: nothing to attribute, nothing
        // uncovered. Not an error.
        if surface.is_empty() {
            return UsageCoverageReport::default();
        }

        let tables = ResolutionTables::build(index, surface);

        let per_file: Vec<Vec<CoveredOperation>> = if self.parallel && tree.files.len() > 1 {
            self.analyze_files_parallel(&tree.files, surface, &tables)
        } else {
            tree.files
                .iter()
                .map(|file| analyze_file(file, surface, &tables))
                .collect()
        };

        // Merge in enumeration order; first occurrence of a pair wins.
        let mut covered = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for hits in per_file {
            for hit in hits {
                let key = (hit.client_type.clone(), hit.operation.clone());
                if seen.insert(key) {
                    covered.push(hit);
                }
            }
        }

        let uncovered = self.collect_uncovered(surface, &seen);

        debug!(
            "Coverage: {} files, {} covered, {} uncovered",
            tree.file_count(),
            covered.len(),
            uncovered.len()
        );

        UsageCoverageReport {
            file_count: tree.file_count(),
            covered,
            uncovered,
        }
    }

    fn analyze_files_parallel(
        &self,
        files: &[SampleFile],
        surface: &ClientSurface,
        tables: &ResolutionTables,
    ) -> Vec<Vec<CoveredOperation>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_threads)
            .build();

        match pool {
            Ok(pool) => pool.install(|| {
                files
                    .par_iter()
                    .map(|file| analyze_file(file, surface, tables))
                    .collect()
            }),
            // Pool construction failing (thread limits) degrades to serial
            Err(_) => files
                .iter()
                .map(|file| analyze_file(file, surface, tables))
                .collect(),
        }
    }

    /// Everything in the operation map not observed directly or through an
    /// interface/implementer relationship.
    fn collect_uncovered(
        &self,
        surface: &ClientSurface,
        seen: &HashSet<(String, String)>,
    ) -> Vec<UncoveredOperation> {
        let was_seen =
            |t: &str, m: &str| seen.contains(&(t.to_string(), m.to_string()));

        let mut uncovered = Vec::new();
        for (client_type, operations) in &surface.operations {
            for (operation, signature) in operations {
                if was_seen(client_type, operation) {
                    continue;
                }

                // Calling through an interface-typed variable counts as
                // coverage of the implementer's operation, and vice versa.
                let via_interface = surface
                    .implementer_interfaces
                    .get(client_type)
                    .map(|ifaces| ifaces.iter().any(|i| was_seen(i, operation)))
                    .unwrap_or(false);
                let via_implementer = surface
                    .interface_implementers
                    .get(client_type)
                    .map(|impls| impls.iter().any(|c| was_seen(c, operation)))
                    .unwrap_or(false);

                if !via_interface && !via_implementer {
                    uncovered.push(UncoveredOperation {
                        client_type: client_type.clone(),
                        operation: operation.clone(),
                        signature: signature.clone(),
                    });
                }
            }
        }
        uncovered
    }
}

/// One file: a single binding pass, then a scan over every call site.
fn analyze_file(
    file: &SampleFile,
    surface: &ClientSurface,
    tables: &ResolutionTables,
) -> Vec<CoveredOperation> {
    let mut resolver = FileTypeResolver::new(surface, tables);
    resolver.bind_file(file);

    let mut hits = Vec::new();
    for call in &file.calls {
        let Some(client_type) = resolver.resolve_receiver(&call.receiver) else {
            // Resolution ambiguity is absence of evidence, not failure
            continue;
        };
        if surface.contains_operation(&client_type, &call.method) {
            hits.push(CoveredOperation {
                client_type,
                operation: call.method.clone(),
                file: file.display_path(),
                line: call.line,
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceConfig;
    use crate::index::{ApiIndex, ModuleApi, OperationApi, RecordApi};
    use crate::reachability::{ClientSurface, ReachabilityAnalyzer};
    use crate::samples::model::{Binding, CallSite, SampleExpr};
    use std::path::PathBuf;

    fn widget_index() -> ApiIndex {
        let mut widget = RecordApi {
            name: "Widget".to_string(),
            entry_point: true,
            ..Default::default()
        };
        widget.methods.push(OperationApi {
            name: "create".to_string(),
            ..Default::default()
        });
        widget.methods.push(OperationApi {
            name: "delete".to_string(),
            ..Default::default()
        });

        ApiIndex {
            package: "widgets".to_string(),
            modules: vec![ModuleApi {
                name: ".".to_string(),
                records: vec![widget],
                ..Default::default()
            }],
            dependencies: Vec::new(),
        }
    }

    fn surface_of(index: &ApiIndex) -> ClientSurface {
        let analyzer = ReachabilityAnalyzer::new().unwrap();
        let analysis = analyzer.analyze(index);
        ClientSurface::from_analysis(index, &analysis)
    }

    fn static_call(type_name: &str, method: &str, line: usize) -> CallSite {
        CallSite {
            receiver: SampleExpr::Identifier(type_name.to_string()),
            method: method.to_string(),
            line,
        }
    }

    #[test]
    fn test_dedup_first_occurrence_across_files() {
        let index = widget_index();
        let surface = surface_of(&index);
        let engine = UsageCoverageEngine::new(&PerformanceConfig {
            max_threads: 4,
            parallel: true,
        });

        let mut first = SampleFile::new(PathBuf::from("a.rs"));
        first.calls.push(static_call("Widget", "create", 3));
        let mut second = SampleFile::new(PathBuf::from("b.rs"));
        second.calls.push(static_call("Widget", "create", 9));

        let tree = SampleTree {
            files: vec![first, second],
        };
        let report = engine.analyze(&tree, &index, &surface);

        assert_eq!(report.file_count, 2);
        assert_eq!(report.covered.len(), 1);
        assert_eq!(report.covered[0].file, "a.rs");
        assert_eq!(report.covered[0].line, 3);
        assert_eq!(report.uncovered.len(), 1);
        assert_eq!(report.uncovered[0].operation, "delete");
    }

    #[test]
    fn test_coverage_partition_is_exact() {
        let index = widget_index();
        let surface = surface_of(&index);
        let engine = UsageCoverageEngine::new(&PerformanceConfig::default());

        let mut file = SampleFile::new(PathBuf::from("a.rs"));
        file.calls.push(static_call("Widget", "create", 1));
        let tree = SampleTree { files: vec![file] };

        let report = engine.analyze(&tree, &index, &surface);
        let mut keys: Vec<(String, String)> = report
            .covered
            .iter()
            .map(|c| (c.client_type.clone(), c.operation.clone()))
            .chain(
                report
                    .uncovered
                    .iter()
                    .map(|u| (u.client_type.clone(), u.operation.clone())),
            )
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), surface.operation_count());
    }

    #[test]
    fn test_empty_tree_reports_everything_uncovered() {
        let index = widget_index();
        let surface = surface_of(&index);
        let engine = UsageCoverageEngine::new(&PerformanceConfig::default());

        let report = engine.analyze(&SampleTree::default(), &index, &surface);
        assert_eq!(report.file_count, 0);
        assert!(report.covered.is_empty());
        assert_eq!(report.uncovered.len(), 2);
    }

    #[test]
    fn test_empty_surface_short_circuits() {
        let index = ApiIndex::default();
        let surface = surface_of(&index);
        let engine = UsageCoverageEngine::new(&PerformanceConfig::default());

        let mut file = SampleFile::new(PathBuf::from("a.rs"));
        file.calls.push(static_call("Widget", "create", 1));
        let tree = SampleTree { files: vec![file] };

        let report = engine.analyze(&tree, &index, &surface);
        assert_eq!(report.file_count, 0);
        assert!(report.covered.is_empty());
        assert!(report.uncovered.is_empty());
    }

    #[test]
    fn test_tracked_variable_call() {
        let index = widget_index();
        let surface = surface_of(&index);
        let engine = UsageCoverageEngine::new(&PerformanceConfig::default());

        let mut file = SampleFile::new(PathBuf::from("a.rs"));
        file.bindings.push(Binding {
            name: "w".to_string(),
            annotation: Some("Widget".to_string()),
            value: None,
            line: 1,
        });
        file.calls.push(CallSite {
            receiver: SampleExpr::Identifier("w".to_string()),
            method: "delete".to_string(),
            line: 2,
        });
        let tree = SampleTree { files: vec![file] };

        let report = engine.analyze(&tree, &index, &surface);
        assert_eq!(report.covered.len(), 1);
        assert_eq!(report.covered[0].operation, "delete");
        assert_eq!(report.uncovered[0].operation, "create");
    }
}

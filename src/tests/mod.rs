
use std::path::Path;

use crate::config::PerformanceConfig;
use crate::coverage::{UsageCoverageEngine, UsageCoverageReport};
use crate::index::{ApiIndex, InterfaceApi, ModuleApi, OperationApi, RecordApi};
use crate::reachability::{ClientSurface, ReachabilityAnalyzer};
use crate::samples::{RustSampleWalker, SampleTree};

pub fn method(name: &str) -> OperationApi {
    OperationApi {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn method_returning(name: &str, ret: &str) -> OperationApi {
    OperationApi {
        name: name.to_string(),
        ret: ret.to_string(),
        ..Default::default()
    }
}

pub fn record(name: &str, entry_point: bool, methods: Vec<OperationApi>) -> RecordApi {
    RecordApi {
        name: name.to_string(),
        entry_point,
        methods,
        ..Default::default()
    }
}

pub fn interface(name: &str, methods: Vec<OperationApi>) -> InterfaceApi {
    InterfaceApi {
        name: name.to_string(),
        methods,
        ..Default::default()
    }
}

pub fn index_of(
    records: Vec<RecordApi>,
    interfaces: Vec<InterfaceApi>,
    functions: Vec<OperationApi>,
) -> ApiIndex {
    ApiIndex {
        package: "test-sdk".to_string(),
        modules: vec![ModuleApi {
            name: ".".to_string(),
            records,
            interfaces,
            functions,
            ..Default::default()
        }],
        dependencies: Vec::new(),
    }
}

/// Walk Rust sample sources through the full pipeline: reachability, client
/// surface, walker, coverage engine.
pub fn analyze_sources(index: &ApiIndex, sources: &[(&str, &str)]) -> UsageCoverageReport {
    let analyzer = ReachabilityAnalyzer::new().expect("analyzer");
    let analysis = analyzer.analyze(index);
    let surface = ClientSurface::from_analysis(index, &analysis);

    let mut walker = RustSampleWalker::new().expect("walker");
    let files = sources
        .iter()
        .map(|(path, source)| {
            walker
                .walk_source(source, Path::new(path))
                .expect("sample parses")
        })
        .collect();

    let engine = UsageCoverageEngine::new(&PerformanceConfig::default());
    engine.analyze(&SampleTree { files }, index, &surface)
}

pub fn covered_pairs(report: &UsageCoverageReport) -> Vec<(String, String)> {
    report
        .covered
        .iter()
        .map(|c| (c.client_type.clone(), c.operation.clone()))
        .collect()
}

pub fn uncovered_pairs(report: &UsageCoverageReport) -> Vec<(String, String)> {
    report
        .uncovered
        .iter()
        .map(|u| (u.client_type.clone(), u.operation.clone()))
        .collect()
}

use std::fs;
use tempfile::TempDir;

use api_coverage_analyzer::config::Config;
use api_coverage_analyzer::coverage::UsageCoverageEngine;
use api_coverage_analyzer::formatter::SurfaceFormatter;
use api_coverage_analyzer::index::ApiIndex;
use api_coverage_analyzer::reachability::{ClientSurface, ReachabilityAnalyzer};
use api_coverage_analyzer::samples::SampleTreeLoader;

fn sdk_index() -> ApiIndex {
    let json = r#"{
        "package": "github.com/example/blobstore",
        "modules": [{
            "name": ".",
            "records": [
                {
                    "name": "BlobClient",
                    "entryPoint": true,
                    "methods": [
                        {"name": "upload", "sig": "data []byte", "ret": "(*Receipt, error)"},
                        {"name": "download", "sig": "key string", "ret": "[]byte"},
                        {"name": "container", "sig": "name string", "ret": "*ContainerClient"}
                    ]
                },
                {
                    "name": "ContainerClient",
                    "methods": [
                        {"name": "list", "sig": ""},
                        {"name": "purge", "sig": ""}
                    ]
                },
                {
                    "name": "Receipt",
                    "fields": [{"name": "key", "type": "string"}]
                }
            ],
            "functions": [
                {"name": "new_blob_client", "sig": "endpoint string", "ret": "*BlobClient"}
            ]
        }]
    }"#;
    serde_json::from_str(json).expect("index json parses")
}

fn write_samples(root: &std::path::Path) {
    fs::write(
        root.join("upload_sample.rs"),
        r#"
fn main() {
    let client = new_blob_client();
    client.upload();
}
"#,
    )
    .unwrap();

    fs::create_dir(root.join("containers")).unwrap();
    fs::write(
        root.join("containers").join("list_sample.rs"),
        r#"
fn main() {
    let client = new_blob_client();
    client.container().list();
}
"#,
    )
    .unwrap();

    // Test-suffixed files never count as samples
    fs::write(
        root.join("upload_test.rs"),
        "fn main() { let c = new_blob_client(); c.download(); }",
    )
    .unwrap();
}

#[test]
fn test_end_to_end_coverage_over_sample_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_samples(root);

    let index = sdk_index();
    let analyzer = ReachabilityAnalyzer::new().unwrap();
    let analysis = analyzer.analyze(&index);
    let surface = ClientSurface::from_analysis(&index, &analysis);

    assert!(analysis.reachable.contains("BlobClient"));
    assert!(analysis.reachable.contains("ContainerClient"));
    assert!(analysis.reachable.contains("Receipt"));
    // Receipt has no operations, so it never becomes a client type
    assert!(!surface.operations.contains_key("Receipt"));

    let config = Config::from_samples_root(root);
    let mut loader = SampleTreeLoader::new(&config).unwrap();
    let tree = loader.load(root).unwrap();
    assert_eq!(tree.file_count(), 2);

    let engine = UsageCoverageEngine::new(&config.performance);
    let report = engine.analyze(&tree, &index, &surface);

    let covered: Vec<(&str, &str)> = report
        .covered
        .iter()
        .map(|c| (c.client_type.as_str(), c.operation.as_str()))
        .collect();
    assert!(covered.contains(&("BlobClient", "upload")));
    assert!(covered.contains(&("BlobClient", "container")));
    assert!(covered.contains(&("ContainerClient", "list")));
    // The excluded test file was the only download caller
    assert!(!covered.contains(&("BlobClient", "download")));

    let uncovered: Vec<(&str, &str)> = report
        .uncovered
        .iter()
        .map(|u| (u.client_type.as_str(), u.operation.as_str()))
        .collect();
    assert!(uncovered.contains(&("BlobClient", "download")));
    assert!(uncovered.contains(&("ContainerClient", "purge")));

    let total = report.covered.len() + report.uncovered.len();
    assert_eq!(total, surface.operation_count());
}

#[test]
fn test_surface_render_after_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_samples(root);

    let index = sdk_index();
    let analyzer = ReachabilityAnalyzer::new().unwrap();
    let analysis = analyzer.analyze(&index);
    let surface = ClientSurface::from_analysis(&index, &analysis);

    let config = Config::from_samples_root(root);
    let mut loader = SampleTreeLoader::new(&config).unwrap();
    let tree = loader.load(root).unwrap();
    let engine = UsageCoverageEngine::new(&config.performance);
    let report = engine.analyze(&tree, &index, &surface);

    let formatter = SurfaceFormatter::new(&config.formatter);
    let out = formatter.render(&index, Some(&report));

    assert!(out.starts_with("// github.com/example/blobstore - Public API Surface"));
    assert!(out.contains("// Already covered:"));
    // Only the still-missing operations get declarations
    assert!(out.contains("func (BlobClient) download(key string) []byte"));
    assert!(!out.contains("func (BlobClient) upload"));
    assert!(out.contains("func (ContainerClient) purge()"));
}

#[test]
fn test_report_json_round_trip() {
    let index = sdk_index();
    let analyzer = ReachabilityAnalyzer::new().unwrap();
    let analysis = analyzer.analyze(&index);
    let surface = ClientSurface::from_analysis(&index, &analysis);

    let engine = UsageCoverageEngine::new(&Config::default().performance);
    let report = engine.analyze(&Default::default(), &index, &surface);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"fileCount\":0"));
    assert!(json.contains("\"client\""));
    assert!(json.contains("\"sig\""));

    let parsed: api_coverage_analyzer::coverage::UsageCoverageReport =
        serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.uncovered.len(), report.uncovered.len());
}

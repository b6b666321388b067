pub mod model;

pub use model::{
    AliasApi, ApiIndex, ConstApi, DependencyInfo, FieldApi, InterfaceApi, ModuleApi, OperationApi,
    RecordApi, VarApi,
};

use anyhow::{Context, Result};
use std::io::Read;

/// Load an ApiIndex from a JSON file, or from stdin when the path is "-".
pub fn load_api_index(path: &str) -> Result<ApiIndex> {
    let data = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read API index from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read API index file: {}", path))?
    };

    serde_json::from_str(&data).with_context(|| format!("Failed to parse API index JSON: {}", path))
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Normalized, language-agnostic description of a library's public surface.
///
/// Produced by an external per-language front end and consumed here as
/// immutable input; the analyzers never parse the target library's source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiIndex {
    pub package: String,
    #[serde(default)]
    pub modules: Vec<ModuleApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleApi {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<OperationApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<ConstApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VarApi>,
}

/// External types referenced by, but not declared in, the indexed library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub package: String,
    #[serde(default, rename = "isStdlib", skip_serializing_if = "std::ops::Not::not")]
    pub is_stdlib: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasApi>,
}

/// A record type: struct or class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordApi {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, rename = "deprecatedMsg", skip_serializing_if = "String::is_empty")]
    pub deprecated_msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldApi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<OperationApi>,
    #[serde(default, rename = "entryPoint", skip_serializing_if = "std::ops::Not::not")]
    pub entry_point: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceApi {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, rename = "deprecatedMsg", skip_serializing_if = "String::is_empty")]
    pub deprecated_msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<OperationApi>,
    #[serde(default, rename = "entryPoint", skip_serializing_if = "std::ops::Not::not")]
    pub entry_point: bool,
}

/// A method or free function. Signature and return type are raw text;
/// they are tokenized to find referenced type names, never type-checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationApi {
    pub name: String,
    #[serde(default)]
    pub sig: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, rename = "static", skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(default, rename = "recv", skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, rename = "deprecatedMsg", skip_serializing_if = "String::is_empty")]
    pub deprecated_msg: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldApi {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasApi {
    pub name: String,
    #[serde(rename = "type")]
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstApi {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub const_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarApi {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub var_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

impl RecordApi {
    pub fn is_operation_holder(&self) -> bool {
        !self.methods.is_empty()
    }

    pub fn has_explicit_entry_point(&self) -> bool {
        self.entry_point && self.is_operation_holder()
    }
}

impl InterfaceApi {
    pub fn is_operation_holder(&self) -> bool {
        !self.methods.is_empty()
    }
}

impl OperationApi {
    /// Best-effort display signature, falling back to "name(...)" when the
    /// front end supplied no parameter text.
    pub fn display_signature(&self) -> String {
        let mut out = if self.sig.is_empty() {
            format!("{}(...)", self.name)
        } else {
            format!("{}({})", self.name, self.sig)
        };
        if !self.ret.is_empty() {
            out.push(' ');
            out.push_str(&self.ret);
        }
        out
    }
}

impl ApiIndex {
    pub fn records(&self) -> impl Iterator<Item = &RecordApi> {
        self.modules.iter().flat_map(|m| m.records.iter())
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceApi> {
        self.modules.iter().flat_map(|m| m.interfaces.iter())
    }

    pub fn functions(&self) -> impl Iterator<Item = &OperationApi> {
        self.modules.iter().flat_map(|m| m.functions.iter())
    }

    /// All declared type names. Cross-module collisions are not deduplicated;
    /// the indexed libraries are assumed to keep type names unique.
    pub fn type_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for record in self.records() {
            names.insert(record.name.clone());
        }
        for iface in self.interfaces() {
            names.insert(iface.name.clone());
        }
        names
    }

    pub fn find_record(&self, name: &str) -> Option<&RecordApi> {
        self.records().find(|r| r.name == name)
    }

    pub fn find_interface(&self, name: &str) -> Option<&InterfaceApi> {
        self.interfaces().find(|i| i.name == name)
    }
}

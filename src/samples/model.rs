use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The walkable abstraction a per-language sample walker must produce.
///
/// This is deliberately small: variable bindings with optional annotations
/// and initializers, call sites with a receiver expression, and member
/// accesses. Anything richer in the source language is dropped on the floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFile {
    pub path: PathBuf,
    pub bindings: Vec<Binding>,
    pub calls: Vec<CallSite>,
}

/// A variable declaration or assignment, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub annotation: Option<String>,
    pub value: Option<SampleExpr>,
    pub line: usize,
}

/// A method invocation with a receiver sub-expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub receiver: SampleExpr,
    pub method: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SampleExpr {
    Identifier(String),
    /// Direct construction of a named type (struct literal, constructor call)
    Construct { type_name: String },
    FunctionCall { function: String },
    MethodCall { receiver: Box<SampleExpr>, method: String },
    MemberAccess { receiver: Box<SampleExpr>, member: String },
    Cast { inner: Box<SampleExpr>, type_name: String },
}

impl SampleFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            bindings: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// All sample files of one analysis run, in enumeration order. The engine's
/// first-occurrence dedup is defined against this order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleTree {
    pub files: Vec<SampleFile>,
}

impl SampleTree {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

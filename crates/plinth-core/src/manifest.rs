//! Project manifest parsing and validation.
//!
//! A folder is a project exactly when it carries a valid `manifest.json`
//! with non-empty `namespace` and `type` fields. Anything else is ignored
//! by discovery.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name identifying a project.
pub const MANIFEST_FILE: &str = "manifest.json";

/// The kind of component a project ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Application,
    Library,
    Component,
    Card,
}

impl ProjectType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "application" => Some(ProjectType::Application),
            "library" => Some(ProjectType::Library),
            "component" => Some(ProjectType::Component),
            "card" => Some(ProjectType::Card),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectType::Application => "application",
            ProjectType::Library => "library",
            ProjectType::Component => "component",
            ProjectType::Card => "card",
        };
        write!(f, "{name}")
    }
}

/// Parsed project identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub namespace: String,
    pub project_type: ProjectType,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// Both `namespace` and `type` must be present and non-empty; the file
    /// is otherwise disqualified as a project manifest.
    pub fn parse(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| Error::Manifest(format!("not valid JSON: {e}")))?;

        let namespace = value
            .get("namespace")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if namespace.is_empty() {
            return Err(Error::Manifest("missing or empty 'namespace'".to_string()));
        }

        let type_str = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if type_str.is_empty() {
            return Err(Error::Manifest("missing or empty 'type'".to_string()));
        }

        let project_type = ProjectType::parse(type_str)
            .ok_or_else(|| Error::Manifest(format!("unknown project type '{type_str}'")))?;

        Ok(Self {
            namespace: namespace.to_string(),
            project_type,
        })
    }

    /// Read and parse a manifest file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn is_library(&self) -> bool {
        self.project_type == ProjectType::Library
    }
}

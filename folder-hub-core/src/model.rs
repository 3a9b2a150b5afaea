//! Folder and document records shared by every layer of the hierarchy.
//!
//! Nodes reference each other only by id. Navigable views (trees,
//! breadcrumbs) are rebuilt on demand from the flat set held by the store.

use crate::error::{HierarchyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PATH_SEPARATOR: char = '/';

/// A node in the folder hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FolderNode {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` for roots
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// `None` for global folders shared by every department
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    /// Materialized route from the root, e.g. `A/B/C`
    pub path: String,
    pub level: u32,
    #[serde(default)]
    pub is_system_folder: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    #[serde(default)]
    pub updated_by: Option<Uuid>,
    /// Bumped by the store on every persisted change
    #[serde(default)]
    pub version: u64,
}

impl FolderNode {
    /// Create a detached root-level node. The store fills in path and level
    /// from the real parent when the node is added.
    pub fn new(name: impl Into<String>, created_by: Uuid) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            path: name.clone(),
            name,
            description: None,
            parent_id: None,
            department_id: None,
            color: None,
            icon: None,
            display_order: 0,
            level: 0,
            is_system_folder: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            created_by,
            updated_by: None,
            version: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_department(mut self, department_id: Option<Uuid>) -> Self {
        self.department_id = department_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system_folder = true;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_global(&self) -> bool {
        self.department_id.is_none()
    }

    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split(PATH_SEPARATOR)
    }

    /// Sibling ordering key.
    pub fn sort_key(&self) -> (i32, &str) {
        (self.display_order, self.name.as_str())
    }

    pub(crate) fn touch(&mut self, by: Option<Uuid>) {
        self.updated_at = Utc::now();
        if by.is_some() {
            self.updated_by = by;
        }
    }
}

/// Sort folders by `(display_order, name)`.
pub fn sort_folders(folders: &mut [FolderNode]) {
    folders.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Reject names that would break the materialized path.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains(PATH_SEPARATOR) {
        return Err(HierarchyError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A document as seen by the hierarchy: only its placement and size matter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: Uuid,
    pub name: String,
    /// `None` for unfiled documents
    #[serde(default)]
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub size_bytes: u64,
}

impl DocumentRef {
    pub fn new(name: impl Into<String>, folder_id: Option<Uuid>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            folder_id,
            department_id: None,
            size_bytes,
        }
    }
}

/// A folder together with its direct children.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderWithChildren {
    pub folder: FolderNode,
    pub children: Vec<FolderNode>,
}

/// A folder together with the documents filed directly in it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderWithDocuments {
    pub folder: FolderNode,
    pub documents: Vec<DocumentRef>,
}

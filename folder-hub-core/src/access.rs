//! Folder visibility checks.

use crate::model::FolderNode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

/// The acting user, as resolved by the authentication layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContext {
    pub id: Uuid,
    pub department_id: Option<Uuid>,
    pub role: Role,
}

impl UserContext {
    pub fn employee(id: Uuid, department_id: Option<Uuid>) -> Self {
        Self {
            id,
            department_id,
            role: Role::Employee,
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }
}

pub trait AccessGate: Send + Sync {
    fn can_user_access_folder(&self, folder: &FolderNode, user: &UserContext) -> bool;
}

/// Admins and managers see everything; global folders are visible to all;
/// otherwise the user's department must match the folder's.
#[derive(Default, Clone, Copy)]
pub struct DepartmentAccessGate;

impl AccessGate for DepartmentAccessGate {
    fn can_user_access_folder(&self, folder: &FolderNode, user: &UserContext) -> bool {
        if user.is_privileged() {
            return true;
        }
        match folder.department_id {
            None => true,
            Some(dept) => user.department_id == Some(dept),
        }
    }
}

//! Entry points used by controllers and view builders.
//!
//! Every call names the acting user and is checked against the
//! [`AccessGate`] before folder data leaves the service. Listings drop
//! folders the user may not see; point operations fail with
//! `Unauthorized`.

use crate::access::{AccessGate, UserContext};
use crate::config::HierarchyConfig;
use crate::error::{HierarchyError, Result};
use crate::model::{FolderNode, FolderWithDocuments};
use crate::store::HierarchyStore;
use crate::tree::{self, FolderTreeNode, TreeBuilder, TreeStats};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct FolderService {
    store: Arc<HierarchyStore>,
    gate: Arc<dyn AccessGate>,
    builder: TreeBuilder,
}

/// Attributes for a new folder.
#[derive(Debug, Clone, Default)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    /// Pick a free sibling name instead of using `name` verbatim
    pub unique_name: bool,
}

impl FolderService {
    pub fn new(store: Arc<HierarchyStore>, gate: Arc<dyn AccessGate>, config: &HierarchyConfig) -> Self {
        Self {
            store,
            gate,
            builder: TreeBuilder::new(config.orphan_policy),
        }
    }

    pub fn store(&self) -> &Arc<HierarchyStore> {
        &self.store
    }

    fn visible(&self, user: &UserContext, folders: Vec<FolderNode>) -> Vec<FolderNode> {
        folders
            .into_iter()
            .filter(|f| self.gate.can_user_access_folder(f, user))
            .collect()
    }

    async fn authorized(&self, user: &UserContext, id: Uuid) -> Result<FolderNode> {
        let folder = self
            .store
            .get_by_id(id)
            .await
            .ok_or(HierarchyError::NotFound(id))?;
        if !self.gate.can_user_access_folder(&folder, user) {
            warn!(user = %user.id, folder = %id, "folder access denied");
            return Err(HierarchyError::Unauthorized {
                user: user.id,
                folder: id,
            });
        }
        Ok(folder)
    }

    /// Active folder of `id`, hiding inactive ones behind `NotFound`.
    async fn authorized_active(&self, user: &UserContext, id: Uuid) -> Result<FolderNode> {
        let folder = self.authorized(user, id).await?;
        if !folder.is_active {
            return Err(HierarchyError::NotFound(id));
        }
        Ok(folder)
    }

    /// Navigable tree of a department's folders plus the global folders
    /// above them, with document rollups. `None` builds the full tree.
    pub async fn folder_tree(
        &self,
        user: &UserContext,
        department_id: Option<Uuid>,
    ) -> Result<Vec<FolderTreeNode>> {
        let folders = match department_id {
            Some(_) => self.store.get_visible_to_department(department_id).await,
            None => self.store.get_by_department(None).await,
        };
        let folders = self.visible(user, folders);
        let ids: Vec<Uuid> = folders.iter().map(|f| f.id).collect();
        let documents = self.store.documents().documents_for_folders(&ids).await?;
        let forest = self.builder.build(&folders, &documents);
        debug!(user = %user.id, folders = folders.len(), roots = forest.len(), "built folder tree");
        Ok(forest)
    }

    pub async fn tree_stats(&self, user: &UserContext, department_id: Option<Uuid>) -> Result<TreeStats> {
        Ok(tree::stats(&self.folder_tree(user, department_id).await?))
    }

    pub async fn get_folder(&self, user: &UserContext, id: Uuid) -> Result<FolderWithDocuments> {
        let folder = self.authorized_active(user, id).await?;
        let documents = self.store.documents().documents_in_folder(id).await?;
        Ok(FolderWithDocuments { folder, documents })
    }

    pub async fn list_department(&self, user: &UserContext, department_id: Option<Uuid>) -> Vec<FolderNode> {
        self.visible(user, self.store.get_by_department(department_id).await)
    }

    pub async fn root_folders(&self, user: &UserContext, department_id: Option<Uuid>) -> Vec<FolderNode> {
        self.visible(user, self.store.get_root_folders(department_id).await)
    }

    pub async fn children(&self, user: &UserContext, parent_id: Uuid) -> Result<Vec<FolderNode>> {
        self.authorized_active(user, parent_id).await?;
        Ok(self.visible(user, self.store.get_children(parent_id).await))
    }

    pub async fn search(
        &self,
        user: &UserContext,
        query: &str,
        department_id: Option<Uuid>,
    ) -> Vec<FolderNode> {
        self.visible(user, self.store.search_by_name(query, department_id).await)
    }

    pub async fn created_by(&self, user: &UserContext, creator_id: Uuid) -> Vec<FolderNode> {
        self.visible(user, self.store.get_by_creator(creator_id).await)
    }

    pub async fn breadcrumbs(&self, user: &UserContext, id: Uuid) -> Result<Vec<FolderNode>> {
        self.authorized_active(user, id).await?;
        Ok(self.visible(user, self.store.get_breadcrumbs(id).await))
    }

    pub async fn siblings(&self, user: &UserContext, id: Uuid) -> Result<Vec<FolderNode>> {
        self.authorized_active(user, id).await?;
        Ok(self.visible(user, self.store.get_siblings(id).await))
    }

    pub async fn depth(&self, user: &UserContext, id: Uuid) -> Result<i32> {
        self.authorized_active(user, id).await?;
        Ok(self.store.get_depth(id).await)
    }

    pub async fn create_folder(&self, user: &UserContext, new: NewFolder) -> Result<FolderNode> {
        if let Some(pid) = new.parent_id {
            self.authorized_active(user, pid).await?;
        }
        let probe = FolderNode::new(new.name.clone(), user.id).with_department(new.department_id);
        if !self.gate.can_user_access_folder(&probe, user) {
            return Err(HierarchyError::Unauthorized {
                user: user.id,
                folder: probe.id,
            });
        }
        let mut node = probe.with_parent(new.parent_id).with_display_order(new.display_order);
        node.description = new.description;
        node.color = new.color;
        node.icon = new.icon;
        if new.unique_name {
            self.store.create_child_unique(node).await
        } else {
            self.store.add(node).await
        }
    }

    pub async fn rename_folder(&self, user: &UserContext, id: Uuid, name: &str) -> Result<FolderNode> {
        self.authorized(user, id).await?;
        self.store.rename(id, name, Some(user.id)).await
    }

    /// Cycle check only; nothing is written.
    pub async fn can_move(&self, user: &UserContext, id: Uuid, target_id: Option<Uuid>) -> Result<bool> {
        self.authorized(user, id).await?;
        if let Some(tid) = target_id {
            self.authorized(user, tid).await?;
        }
        self.store.can_move_to(id, target_id).await
    }

    pub async fn move_folder(
        &self,
        user: &UserContext,
        id: Uuid,
        target_id: Option<Uuid>,
        expected_version: Option<u64>,
    ) -> Result<FolderNode> {
        self.authorized(user, id).await?;
        if let Some(tid) = target_id {
            self.authorized_active(user, tid).await?;
        }
        self.store
            .move_folder(id, target_id, expected_version, Some(user.id))
            .await
    }

    pub async fn deactivate_folder(&self, user: &UserContext, id: Uuid) -> Result<FolderNode> {
        self.authorized(user, id).await?;
        self.store.set_active(id, false, Some(user.id)).await
    }

    pub async fn restore_folder(&self, user: &UserContext, id: Uuid) -> Result<FolderNode> {
        self.authorized(user, id).await?;
        self.store.set_active(id, true, Some(user.id)).await
    }

    pub async fn delete_folder(&self, user: &UserContext, id: Uuid) -> Result<()> {
        self.authorized(user, id).await?;
        self.store.delete(id).await
    }
}

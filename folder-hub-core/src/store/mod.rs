//! Folder storage and hierarchical queries.
//!
//! All folders live in one arena keyed by id, guarded by a single async
//! `RwLock`. Every mutation is staged on a copy of the arena, persisted, and
//! only then swapped in, so a failed write never leaves paths half rebuilt.
//! A move runs its cycle check and its write under the same guard.

mod integrity;

pub use integrity::IntegrityReport;

use crate::config::HierarchyConfig;
use crate::documents::DocumentRepository;
use crate::error::{HierarchyError, Result};
use crate::guard;
use crate::model::{
    sort_folders, validate_name, FolderNode, FolderWithChildren, FolderWithDocuments,
};
use crate::naming::generate_unique_child_name;
use crate::path;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FOLDERS_FILE: &str = "folders.json";

pub(crate) type Arena = HashMap<Uuid, FolderNode>;

pub struct HierarchyStore {
    folders: RwLock<Arena>,
    documents: Arc<dyn DocumentRepository>,
    dir: Option<PathBuf>,
    max_depth: u32,
    search_descriptions: bool,
}

impl HierarchyStore {
    /// A store that never touches disk.
    pub fn in_memory(documents: Arc<dyn DocumentRepository>) -> Self {
        let config = HierarchyConfig::default();
        Self {
            folders: RwLock::new(HashMap::new()),
            documents,
            dir: None,
            max_depth: config.max_depth,
            search_descriptions: config.search_descriptions,
        }
    }

    /// Open (or create) a store persisted as `folders.json` inside `dir`.
    pub async fn open(dir: impl Into<PathBuf>, documents: Arc<dyn DocumentRepository>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let file = dir.join(FOLDERS_FILE);
        let mut folders = HashMap::new();
        if tokio::fs::try_exists(&file).await? {
            let data = tokio::fs::read(&file).await?;
            let nodes: Vec<FolderNode> = serde_json::from_slice(&data)?;
            for node in nodes {
                folders.insert(node.id, node);
            }
        }
        info!(dir = %dir.display(), count = folders.len(), "opened folder store");
        let config = HierarchyConfig::default();
        Ok(Self {
            folders: RwLock::new(folders),
            documents,
            dir: Some(dir),
            max_depth: config.max_depth,
            search_descriptions: config.search_descriptions,
        })
    }

    pub async fn from_config(
        config: &HierarchyConfig,
        documents: Arc<dyn DocumentRepository>,
    ) -> Result<Self> {
        let mut store = match &config.data_dir {
            Some(dir) => Self::open(dir.clone(), documents).await?,
            None => Self::in_memory(documents),
        };
        store.max_depth = config.max_depth;
        store.search_descriptions = config.search_descriptions;
        let too_deep = integrity::past_depth(store.folders.get_mut(), store.max_depth);
        if !too_deep.is_empty() {
            warn!(
                count = too_deep.len(),
                max_depth = store.max_depth,
                "stored folders nest deeper than max_depth; their ancestry lookups will fail"
            );
        }
        Ok(store)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn documents(&self) -> &Arc<dyn DocumentRepository> {
        &self.documents
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    async fn persist(&self, arena: &Arena) -> Result<()> {
        let Some(dir) = &self.dir else { return Ok(()) };
        let mut nodes: Vec<&FolderNode> = arena.values().collect();
        nodes.sort_by(|a, b| (a.level, &a.path, a.id).cmp(&(b.level, &b.path, b.id)));
        let data = serde_json::to_vec_pretty(&nodes)?;
        let tmp = dir.join(format!("{}.tmp", FOLDERS_FILE));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, dir.join(FOLDERS_FILE)).await?;
        Ok(())
    }

    async fn commit(&self, current: &mut Arena, staged: Arena) -> Result<()> {
        self.persist(&staged).await?;
        *current = staged;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Point lookups
    // ---------------------------------------------------------------------

    pub async fn get_by_id(&self, id: Uuid) -> Option<FolderNode> {
        self.folders.read().await.get(&id).cloned()
    }

    pub async fn get_with_children(&self, id: Uuid) -> Option<FolderWithChildren> {
        let folders = self.folders.read().await;
        let folder = folders.get(&id)?.clone();
        let children = active_children(&folders, id);
        Some(FolderWithChildren { folder, children })
    }

    pub async fn get_with_documents(&self, id: Uuid) -> Result<Option<FolderWithDocuments>> {
        let Some(folder) = self.get_by_id(id).await else {
            return Ok(None);
        };
        let documents = self.documents.documents_in_folder(id).await?;
        Ok(Some(FolderWithDocuments { folder, documents }))
    }

    pub async fn get_parent(&self, id: Uuid) -> Option<FolderNode> {
        let folders = self.folders.read().await;
        let pid = folders.get(&id)?.parent_id?;
        folders.get(&pid).cloned()
    }

    pub async fn exists(&self, id: Uuid) -> bool {
        self.folders.read().await.contains_key(&id)
    }

    /// Counts inactive children too, since they would be orphaned by a delete.
    pub async fn has_children(&self, id: Uuid) -> bool {
        self.folders
            .read()
            .await
            .values()
            .any(|f| f.parent_id == Some(id))
    }

    pub async fn has_documents(&self, id: Uuid) -> Result<bool> {
        Ok(self.documents.count_in_folder(id).await? > 0)
    }

    /// Every folder, active or not, in no particular order.
    pub async fn all(&self) -> Vec<FolderNode> {
        self.folders.read().await.values().cloned().collect()
    }

    // ---------------------------------------------------------------------
    // Listings (active folders, ordered by display order then name)
    // ---------------------------------------------------------------------

    /// Folders of one department; `None` lists every folder.
    pub async fn get_by_department(&self, department_id: Option<Uuid>) -> Vec<FolderNode> {
        self.list(|f| department_id.map_or(true, |d| f.department_id == Some(d)))
            .await
    }

    /// Folders of one department plus the global folders it may hang under.
    pub async fn get_visible_to_department(&self, department_id: Option<Uuid>) -> Vec<FolderNode> {
        self.list(|f| f.department_id.is_none() || f.department_id == department_id)
            .await
    }

    pub async fn get_root_folders(&self, department_id: Option<Uuid>) -> Vec<FolderNode> {
        self.list(|f| {
            f.parent_id.is_none() && department_id.map_or(true, |d| f.department_id == Some(d))
        })
        .await
    }

    pub async fn get_children(&self, parent_id: Uuid) -> Vec<FolderNode> {
        active_children(&*self.folders.read().await, parent_id)
    }

    pub async fn get_siblings(&self, id: Uuid) -> Vec<FolderNode> {
        let folders = self.folders.read().await;
        let Some(node) = folders.get(&id) else {
            return Vec::new();
        };
        let parent = node.parent_id;
        let mut out: Vec<FolderNode> = folders
            .values()
            .filter(|f| f.is_active && f.parent_id == parent && f.id != id)
            .cloned()
            .collect();
        sort_folders(&mut out);
        out
    }

    /// Case-insensitive substring match on the name (and the description when
    /// enabled). A blank query matches nothing.
    pub async fn search_by_name(&self, query: &str, department_id: Option<Uuid>) -> Vec<FolderNode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let search_descriptions = self.search_descriptions;
        self.list(|f| {
            if department_id.is_some_and(|d| f.department_id != Some(d)) {
                return false;
            }
            f.name.to_lowercase().contains(&needle)
                || (search_descriptions
                    && f.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle)))
        })
        .await
    }

    pub async fn get_by_creator(&self, creator_id: Uuid) -> Vec<FolderNode> {
        self.list(|f| f.created_by == creator_id).await
    }

    async fn list(&self, pred: impl Fn(&FolderNode) -> bool) -> Vec<FolderNode> {
        let mut out: Vec<FolderNode> = self
            .folders
            .read()
            .await
            .values()
            .filter(|f| f.is_active && pred(f))
            .cloned()
            .collect();
        sort_folders(&mut out);
        out
    }

    // ---------------------------------------------------------------------
    // Ancestry
    // ---------------------------------------------------------------------

    /// Whether `ancestor_id` appears on the parent chain of `child_id`.
    /// A folder is never its own descendant.
    pub async fn is_descendant_of(&self, child_id: Uuid, ancestor_id: Uuid) -> bool {
        let folders = self.folders.read().await;
        ancestor_chain(&folders, child_id, self.max_depth)
            .map_or(false, |chain| chain.contains(&ancestor_id))
    }

    /// Parent hops to a root, or -1 when the folder does not exist or its
    /// chain is broken.
    pub async fn get_depth(&self, id: Uuid) -> i32 {
        let folders = self.folders.read().await;
        match ancestor_chain(&folders, id, self.max_depth) {
            Some(chain) => chain.len() as i32,
            None => -1,
        }
    }

    /// Ancestors from the parent up to the root.
    pub async fn ancestor_ids(&self, id: Uuid) -> Vec<Uuid> {
        let folders = self.folders.read().await;
        ancestor_chain(&folders, id, self.max_depth).unwrap_or_default()
    }

    pub async fn descendant_ids(&self, id: Uuid) -> HashSet<Uuid> {
        guard::descendant_ids(&*self.folders.read().await, id)
    }

    /// Root-to-node route, ending with the node itself.
    pub async fn get_breadcrumbs(&self, id: Uuid) -> Vec<FolderNode> {
        let folders = self.folders.read().await;
        let Some(node) = folders.get(&id) else {
            return Vec::new();
        };
        let chain = ancestor_chain(&folders, id, self.max_depth).unwrap_or_default();
        let mut crumbs: Vec<FolderNode> = chain
            .iter()
            .rev()
            .filter_map(|aid| folders.get(aid).cloned())
            .collect();
        crumbs.push(node.clone());
        crumbs
    }

    /// Cycle check against current state without moving anything.
    pub async fn can_move_to(&self, id: Uuid, target_id: Option<Uuid>) -> Result<bool> {
        let folders = self.folders.read().await;
        let node = folders.get(&id).ok_or(HierarchyError::NotFound(id))?;
        let target = match target_id {
            Some(tid) => Some(folders.get(&tid).ok_or(HierarchyError::NotFound(tid))?),
            None => None,
        };
        Ok(guard::can_move_to(&folders, node, target))
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a new folder. Path, level and version are derived here; the
    /// parent must exist and belong to a compatible department.
    pub async fn add(&self, node: FolderNode) -> Result<FolderNode> {
        let mut folders = self.folders.write().await;
        let mut staged = folders.clone();
        let added = self.stage_add(&mut staged, node)?;
        self.commit(&mut folders, staged).await?;
        info!(folder = %added.id, path = %added.path, "created folder");
        Ok(added)
    }

    /// Add `node`, first replacing its name with one that is free among
    /// the children of its parent.
    pub async fn create_child_unique(&self, mut node: FolderNode) -> Result<FolderNode> {
        validate_name(&node.name)?;
        let mut folders = self.folders.write().await;
        node.name = generate_unique_child_name(
            folders
                .values()
                .filter(|f| f.parent_id == node.parent_id)
                .map(|f| f.name.as_str()),
            &node.name,
        );
        let mut staged = folders.clone();
        let added = self.stage_add(&mut staged, node)?;
        self.commit(&mut folders, staged).await?;
        info!(folder = %added.id, path = %added.path, "created folder");
        Ok(added)
    }

    fn stage_add(&self, arena: &mut Arena, mut node: FolderNode) -> Result<FolderNode> {
        validate_name(&node.name)?;
        if arena.contains_key(&node.id) {
            return Err(HierarchyError::AlreadyExists(node.id));
        }
        let parent = match node.parent_id {
            Some(pid) => {
                let parent = arena.get(&pid).ok_or(HierarchyError::NotFound(pid))?;
                guard::check_department(&node, parent)?;
                check_parent_active(&node, parent)?;
                Some(parent)
            }
            None => None,
        };
        path::rebuild_path(&mut node, parent);
        if node.level >= self.max_depth {
            return Err(HierarchyError::TooDeep {
                id: node.id,
                max_depth: self.max_depth,
            });
        }
        node.version = 1;
        node.updated_at = node.created_at;
        arena.insert(node.id, node.clone());
        Ok(node)
    }

    /// Replace a folder's editable fields. The caller's `version` must match
    /// the stored one. A changed parent goes through the same validation as
    /// [`HierarchyStore::move_folder`]; a changed name or parent cascades the
    /// path rebuild to every descendant. `is_active` and `is_system_folder`
    /// keep their stored values: activation only changes through
    /// [`HierarchyStore::set_active`].
    pub async fn update(&self, node: FolderNode) -> Result<FolderNode> {
        validate_name(&node.name)?;
        let mut folders = self.folders.write().await;
        let current = folders.get(&node.id).ok_or(HierarchyError::NotFound(node.id))?;
        check_version(current, node.version)?;

        let mut staged = folders.clone();
        if current.parent_id != node.parent_id || current.department_id != node.department_id {
            let target = match node.parent_id {
                Some(tid) => Some(staged.get(&tid).ok_or(HierarchyError::NotFound(tid))?),
                None => None,
            };
            guard::validate_move(&staged, &node, target)?;
            if let Some(parent) = target {
                check_parent_active(current, parent)?;
            }
            for child in staged.values().filter(|f| f.parent_id == Some(node.id)) {
                guard::check_department(child, &node)?;
            }
        }

        let mut updated = node;
        updated.created_at = current.created_at;
        updated.created_by = current.created_by;
        updated.is_active = current.is_active;
        updated.is_system_folder = current.is_system_folder;
        updated.touch(None);
        let id = updated.id;
        staged.insert(id, updated);
        let changed = self.rebuild_staged(&mut staged, id)?;
        bump_versions(&mut staged, std::iter::once(id).chain(changed));

        let result = staged[&id].clone();
        self.commit(&mut folders, staged).await?;
        debug!(folder = %id, version = result.version, "updated folder");
        Ok(result)
    }

    /// Reparent `id` under `target_id` (`None` makes it a root). The cycle
    /// check, the write, and the subtree path rebuild happen under one lock.
    pub async fn move_folder(
        &self,
        id: Uuid,
        target_id: Option<Uuid>,
        expected_version: Option<u64>,
        moved_by: Option<Uuid>,
    ) -> Result<FolderNode> {
        let mut folders = self.folders.write().await;
        let node = folders.get(&id).ok_or(HierarchyError::NotFound(id))?;
        if let Some(expected) = expected_version {
            check_version(node, expected)?;
        }
        let target = match target_id {
            Some(tid) => Some(folders.get(&tid).ok_or(HierarchyError::NotFound(tid))?),
            None => None,
        };
        if let Err(err) = guard::validate_move(&folders, node, target) {
            warn!(folder = %id, target = ?target_id, error = %err, "move refused");
            return Err(err);
        }
        if node.parent_id == target_id {
            return Ok(node.clone());
        }
        if let Some(parent) = target {
            check_parent_active(node, parent)?;
        }

        let mut staged = folders.clone();
        if let Some(moved) = staged.get_mut(&id) {
            moved.parent_id = target_id;
            moved.touch(moved_by);
        }
        let changed = self.rebuild_staged(&mut staged, id)?;
        bump_versions(&mut staged, std::iter::once(id).chain(changed.iter().copied()));

        let result = staged[&id].clone();
        self.commit(&mut folders, staged).await?;
        info!(folder = %id, path = %result.path, rebuilt = changed.len(), "moved folder");
        Ok(result)
    }

    pub async fn rename(&self, id: Uuid, name: &str, renamed_by: Option<Uuid>) -> Result<FolderNode> {
        validate_name(name)?;
        let mut folders = self.folders.write().await;
        if !folders.contains_key(&id) {
            return Err(HierarchyError::NotFound(id));
        }
        let mut staged = folders.clone();
        if let Some(node) = staged.get_mut(&id) {
            node.name = name.to_string();
            node.touch(renamed_by);
        }
        let changed = self.rebuild_staged(&mut staged, id)?;
        bump_versions(&mut staged, std::iter::once(id).chain(changed));

        let result = staged[&id].clone();
        self.commit(&mut folders, staged).await?;
        info!(folder = %id, path = %result.path, "renamed folder");
        Ok(result)
    }

    /// Give the listed children of `parent_id` display orders 0, 1, 2, ...
    pub async fn reorder(&self, parent_id: Option<Uuid>, ordered_ids: &[Uuid]) -> Result<()> {
        let mut folders = self.folders.write().await;
        let mut staged = folders.clone();
        for (position, id) in ordered_ids.iter().enumerate() {
            let node = staged
                .get_mut(id)
                .filter(|n| n.parent_id == parent_id)
                .ok_or(HierarchyError::NotFound(*id))?;
            if node.display_order != position as i32 {
                node.display_order = position as i32;
                node.touch(None);
                node.version += 1;
            }
        }
        self.commit(&mut folders, staged).await?;
        debug!(parent = ?parent_id, count = ordered_ids.len(), "reordered folders");
        Ok(())
    }

    /// Soft delete or restore a folder together with everything below it.
    /// Restoring is refused while any ancestor is still inactive.
    pub async fn set_active(&self, id: Uuid, active: bool, by: Option<Uuid>) -> Result<FolderNode> {
        let mut folders = self.folders.write().await;
        if !folders.contains_key(&id) {
            return Err(HierarchyError::NotFound(id));
        }
        if active {
            let chain = ancestor_chain(&folders, id, self.max_depth).unwrap_or_default();
            let inactive = chain
                .into_iter()
                .find(|aid| folders.get(aid).is_some_and(|a| !a.is_active));
            if let Some(ancestor) = inactive {
                warn!(folder = %id, ancestor = %ancestor, "restore refused under inactive ancestor");
                return Err(HierarchyError::InactiveAncestor { folder: id, ancestor });
            }
        }
        let mut staged = folders.clone();
        let mut affected: Vec<Uuid> = guard::descendant_ids(&staged, id).into_iter().collect();
        affected.push(id);
        for fid in &affected {
            if let Some(node) = staged.get_mut(fid) {
                if node.is_active != active {
                    node.is_active = active;
                    node.touch(by);
                    node.version += 1;
                }
            }
        }
        let result = staged[&id].clone();
        self.commit(&mut folders, staged).await?;
        info!(folder = %id, active, affected = affected.len(), "changed folder activation");
        Ok(result)
    }

    /// Hard delete. Refused for system folders and for folders that still
    /// hold child folders (active or not) or documents.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut folders = self.folders.write().await;
        let node = folders.get(&id).ok_or(HierarchyError::NotFound(id))?;
        if node.is_system_folder {
            return Err(HierarchyError::BlockedBySystemFlag(id));
        }
        if folders.values().any(|f| f.parent_id == Some(id))
            || self.documents.count_in_folder(id).await? > 0
        {
            return Err(HierarchyError::BlockedByNonEmpty(id));
        }
        let mut staged = folders.clone();
        staged.remove(&id);
        self.commit(&mut folders, staged).await?;
        info!(folder = %id, "deleted folder");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Integrity
    // ---------------------------------------------------------------------

    pub async fn verify_integrity(&self) -> IntegrityReport {
        integrity::check(&*self.folders.read().await, self.max_depth)
    }

    /// Recompute every reachable path and level from the roots. Returns how
    /// many folders changed.
    pub async fn repair_paths(&self) -> Result<usize> {
        let mut folders = self.folders.write().await;
        let mut staged = folders.clone();
        let changed = path::rebuild_all(&mut staged);
        if changed.is_empty() {
            return Ok(0);
        }
        bump_versions(&mut staged, changed.iter().copied());
        self.commit(&mut folders, staged).await?;
        warn!(count = changed.len(), "repaired stale folder paths");
        Ok(changed.len())
    }

    fn rebuild_staged(&self, staged: &mut Arena, id: Uuid) -> Result<Vec<Uuid>> {
        let changed = path::rebuild_subtree(staged, id);
        let too_deep = std::iter::once(&id)
            .chain(changed.iter())
            .find(|fid| staged.get(*fid).is_some_and(|n| n.level >= self.max_depth));
        if let Some(fid) = too_deep {
            return Err(HierarchyError::TooDeep {
                id: *fid,
                max_depth: self.max_depth,
            });
        }
        Ok(changed)
    }
}

fn check_version(node: &FolderNode, expected: u64) -> Result<()> {
    if node.version != expected {
        return Err(HierarchyError::ConcurrencyConflict {
            id: node.id,
            expected,
            actual: node.version,
        });
    }
    Ok(())
}

/// An active folder may only be placed under an active parent.
fn check_parent_active(node: &FolderNode, parent: &FolderNode) -> Result<()> {
    if node.is_active && !parent.is_active {
        return Err(HierarchyError::InactiveAncestor {
            folder: node.id,
            ancestor: parent.id,
        });
    }
    Ok(())
}

fn bump_versions(arena: &mut Arena, ids: impl IntoIterator<Item = Uuid>) {
    let mut seen = HashSet::new();
    for id in ids {
        if seen.insert(id) {
            if let Some(node) = arena.get_mut(&id) {
                node.version += 1;
            }
        }
    }
}

fn active_children(arena: &Arena, parent_id: Uuid) -> Vec<FolderNode> {
    let mut out: Vec<FolderNode> = arena
        .values()
        .filter(|f| f.is_active && f.parent_id == Some(parent_id))
        .cloned()
        .collect();
    sort_folders(&mut out);
    out
}

/// Ancestors of `id` from its parent upward. `None` when `id` is unknown,
/// a parent is missing, or the walk loops or runs past `max_depth`.
pub(crate) fn ancestor_chain(arena: &Arena, id: Uuid, max_depth: u32) -> Option<Vec<Uuid>> {
    let mut current = arena.get(&id)?;
    let mut chain = Vec::new();
    while let Some(pid) = current.parent_id {
        if pid == id || chain.contains(&pid) || chain.len() as u32 >= max_depth {
            warn!(folder = %id, "parent chain loops or exceeds max depth");
            return None;
        }
        chain.push(pid);
        current = arena.get(&pid)?;
    }
    Some(chain)
}

#[cfg(test)]
mod tests;

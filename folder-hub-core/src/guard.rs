//! Move validation: a folder may never end up under itself.

use crate::error::{HierarchyError, Result};
use crate::model::FolderNode;
use crate::path::children_index;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Every folder below `id`, excluding `id` itself.
pub fn descendant_ids(arena: &HashMap<Uuid, FolderNode>, id: Uuid) -> HashSet<Uuid> {
    let index = children_index(arena);
    let mut out = HashSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if let Some(kids) = index.get(&current) {
            for kid in kids {
                if *kid != id && out.insert(*kid) {
                    stack.push(*kid);
                }
            }
        }
    }
    out
}

/// Whether `node` may be reparented under `target` (`None` = make it a root).
pub fn can_move_to(
    arena: &HashMap<Uuid, FolderNode>,
    node: &FolderNode,
    target: Option<&FolderNode>,
) -> bool {
    let Some(target) = target else { return true };
    if target.id == node.id {
        return false;
    }
    !descendant_ids(arena, node.id).contains(&target.id)
}

/// Like [`can_move_to`], but explains a refusal and also rejects a parent
/// from another department.
pub fn validate_move(
    arena: &HashMap<Uuid, FolderNode>,
    node: &FolderNode,
    target: Option<&FolderNode>,
) -> Result<()> {
    if !can_move_to(arena, node, target) {
        // can_move_to only refuses when a target exists
        let target = target.map(|t| t.id).unwrap_or(node.id);
        debug!(node = %node.id, %target, "move refused: cycle");
        return Err(HierarchyError::WouldCreateCycle {
            node: node.id,
            target,
        });
    }
    if let Some(target) = target {
        check_department(node, target)?;
    }
    Ok(())
}

/// A department-scoped folder may only sit under a global folder or one of
/// the same department.
pub fn check_department(node: &FolderNode, parent: &FolderNode) -> Result<()> {
    match (node.department_id, parent.department_id) {
        (Some(own), Some(theirs)) if own != theirs => Err(HierarchyError::DepartmentMismatch {
            node: node.id,
            target: parent.id,
        }),
        _ => Ok(()),
    }
}

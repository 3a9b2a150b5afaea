//! Materialized path and level maintenance.

use crate::model::{FolderNode, PATH_SEPARATOR};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Recompute `path` and `level` of `node` from its (already current) parent.
/// Returns whether anything changed.
pub fn rebuild_path(node: &mut FolderNode, parent: Option<&FolderNode>) -> bool {
    let (path, level) = match parent {
        Some(p) => (
            format!("{}{}{}", p.path, PATH_SEPARATOR, node.name),
            p.level + 1,
        ),
        None => (node.name.clone(), 0),
    };
    if node.path == path && node.level == level {
        return false;
    }
    node.path = path;
    node.level = level;
    true
}

/// Parent id → child ids over the whole arena.
pub fn children_index(arena: &HashMap<Uuid, FolderNode>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut index: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for node in arena.values() {
        if let Some(pid) = node.parent_id {
            index.entry(pid).or_default().push(node.id);
        }
    }
    index
}

/// Rebuild `root_id` and every node below it, breadth first, so each parent
/// is current before its children are visited. Returns the ids whose path or
/// level changed.
pub fn rebuild_subtree(arena: &mut HashMap<Uuid, FolderNode>, root_id: Uuid) -> Vec<Uuid> {
    let index = children_index(arena);
    let mut changed = Vec::new();
    let mut queue = VecDeque::from([root_id]);
    let mut visited = std::collections::HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let parent = arena
            .get(&id)
            .and_then(|n| n.parent_id)
            .and_then(|pid| arena.get(&pid))
            .cloned();
        if let Some(node) = arena.get_mut(&id) {
            if rebuild_path(node, parent.as_ref()) {
                changed.push(id);
            }
        }
        if let Some(kids) = index.get(&id) {
            queue.extend(kids.iter().copied());
        }
    }
    changed
}

/// Rebuild every node reachable from a root. Nodes on a cycle or below a
/// missing parent are not reachable and are left untouched.
pub fn rebuild_all(arena: &mut HashMap<Uuid, FolderNode>) -> Vec<Uuid> {
    let roots: Vec<Uuid> = arena
        .values()
        .filter(|n| n.parent_id.is_none())
        .map(|n| n.id)
        .collect();
    let mut changed = Vec::new();
    for root in roots {
        changed.extend(rebuild_subtree(arena, root));
    }
    changed
}

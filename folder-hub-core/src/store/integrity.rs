//! Consistency scan over the folder arena.

use super::Arena;
use crate::guard::check_department;
use crate::model::PATH_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Structural problems found in the stored hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Stored path or level disagrees with the parent chain
    pub stale_paths: Vec<Uuid>,
    /// Parent id does not resolve
    pub missing_parents: Vec<Uuid>,
    /// Folder sits on a parent cycle
    pub cycles: Vec<Uuid>,
    /// Scoped folder under a folder of another department
    pub department_mismatches: Vec<Uuid>,
    /// Stored level is at or past the configured `max_depth`
    #[serde(default)]
    pub too_deep: Vec<Uuid>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.stale_paths.is_empty()
            && self.missing_parents.is_empty()
            && self.cycles.is_empty()
            && self.department_mismatches.is_empty()
            && self.too_deep.is_empty()
    }
}

pub(super) fn check(arena: &Arena, max_depth: u32) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    for node in arena.values() {
        match node.parent_id {
            None => {
                if node.level != 0 || node.path != node.name {
                    report.stale_paths.push(node.id);
                }
            }
            Some(pid) => match arena.get(&pid) {
                None => report.missing_parents.push(node.id),
                Some(parent) => {
                    let expected = format!("{}{}{}", parent.path, PATH_SEPARATOR, node.name);
                    if node.level != parent.level + 1 || node.path != expected {
                        report.stale_paths.push(node.id);
                    }
                    if check_department(node, parent).is_err() {
                        report.department_mismatches.push(node.id);
                    }
                }
            },
        }
        if on_cycle(arena, node.id) {
            report.cycles.push(node.id);
        }
    }
    report.stale_paths.sort();
    report.missing_parents.sort();
    report.cycles.sort();
    report.department_mismatches.sort();
    report.too_deep = past_depth(arena, max_depth);
    report
}

/// Folders whose level the depth-bounded ancestor walks can no longer cover.
pub(super) fn past_depth(arena: &Arena, max_depth: u32) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = arena
        .values()
        .filter(|n| n.level >= max_depth)
        .map(|n| n.id)
        .collect();
    ids.sort();
    ids
}

fn on_cycle(arena: &Arena, id: Uuid) -> bool {
    let mut seen = HashSet::new();
    let mut current = arena.get(&id).and_then(|n| n.parent_id);
    while let Some(pid) = current {
        if pid == id {
            return true;
        }
        if !seen.insert(pid) {
            // loop above us that does not include `id`
            return false;
        }
        current = arena.get(&pid).and_then(|n| n.parent_id);
    }
    false
}

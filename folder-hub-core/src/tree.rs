//! Flat folder lists to navigable trees, with document rollups.

use crate::model::{sort_folders, DocumentRef, FolderNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// What to do with a folder whose parent is not part of the input set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Drop the folder and everything below it from the tree
    #[default]
    Exclude,
    /// Show the folder as an extra root
    Promote,
}

impl OrphanPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exclude" => Some(OrphanPolicy::Exclude),
            "promote" => Some(OrphanPolicy::Promote),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderTreeNode {
    pub folder: FolderNode,
    pub documents: Vec<DocumentRef>,
    pub children: Vec<FolderTreeNode>,
    pub direct_document_count: usize,
    pub total_document_count: usize,
    pub direct_size_bytes: u64,
    pub total_size_bytes: u64,
}

impl FolderTreeNode {
    pub fn id(&self) -> Uuid {
        self.folder.id
    }

    /// Depth-first search for `id` in this subtree.
    pub fn find(&self, id: Uuid) -> Option<&FolderTreeNode> {
        if self.folder.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Aggregate figures for a whole forest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub folder_count: usize,
    pub document_count: usize,
    pub total_size_bytes: u64,
    /// Deepest nesting below a root of the forest (a lone root is 0)
    pub max_depth: usize,
}

pub struct TreeBuilder {
    orphan_policy: OrphanPolicy,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(OrphanPolicy::default())
    }
}

impl TreeBuilder {
    pub fn new(orphan_policy: OrphanPolicy) -> Self {
        Self { orphan_policy }
    }

    /// Build an ordered forest from a flat folder list and the documents
    /// filed in those folders. Documents pointing at folders outside the
    /// list, and unfiled documents, are ignored.
    pub fn build(&self, folders: &[FolderNode], documents: &[DocumentRef]) -> Vec<FolderTreeNode> {
        let mut sorted = folders.to_vec();
        sort_folders(&mut sorted);

        let present: HashSet<Uuid> = sorted.iter().map(|f| f.id).collect();
        let mut docs_by_folder: HashMap<Uuid, Vec<DocumentRef>> = HashMap::new();
        for doc in documents {
            if let Some(fid) = doc.folder_id.filter(|fid| present.contains(fid)) {
                docs_by_folder.entry(fid).or_default().push(doc.clone());
            }
        }

        let mut roots = Vec::new();
        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (i, folder) in sorted.iter().enumerate() {
            match folder.parent_id {
                None => roots.push(i),
                Some(pid) if present.contains(&pid) => children.entry(pid).or_default().push(i),
                Some(_) => {
                    if self.orphan_policy == OrphanPolicy::Promote {
                        roots.push(i);
                    }
                }
            }
        }

        let mut visited = HashSet::new();
        roots
            .into_iter()
            .filter_map(|i| assemble(i, &sorted, &children, &mut docs_by_folder, &mut visited))
            .collect()
    }
}

// Post-order: children are complete before the parent's totals are summed.
fn assemble(
    index: usize,
    folders: &[FolderNode],
    children: &HashMap<Uuid, Vec<usize>>,
    docs: &mut HashMap<Uuid, Vec<DocumentRef>>,
    visited: &mut HashSet<Uuid>,
) -> Option<FolderTreeNode> {
    let folder = &folders[index];
    if !visited.insert(folder.id) {
        return None;
    }
    let kids: Vec<FolderTreeNode> = children
        .get(&folder.id)
        .map(|list| {
            list.iter()
                .filter_map(|&i| assemble(i, folders, children, docs, visited))
                .collect()
        })
        .unwrap_or_default();

    let documents = docs.remove(&folder.id).unwrap_or_default();
    let direct_document_count = documents.len();
    let direct_size_bytes: u64 = documents.iter().map(|d| d.size_bytes).sum();
    let total_document_count =
        direct_document_count + kids.iter().map(|k| k.total_document_count).sum::<usize>();
    let total_size_bytes =
        direct_size_bytes + kids.iter().map(|k| k.total_size_bytes).sum::<u64>();

    Some(FolderTreeNode {
        folder: folder.clone(),
        documents,
        children: kids,
        direct_document_count,
        total_document_count,
        direct_size_bytes,
        total_size_bytes,
    })
}

/// Pre-order flattening of a forest back to folder records.
pub fn flatten(forest: &[FolderTreeNode]) -> Vec<FolderNode> {
    fn walk(node: &FolderTreeNode, out: &mut Vec<FolderNode>) {
        out.push(node.folder.clone());
        for child in &node.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for root in forest {
        walk(root, &mut out);
    }
    out
}

/// Find a node anywhere in the forest.
pub fn find<'a>(forest: &'a [FolderTreeNode], id: Uuid) -> Option<&'a FolderTreeNode> {
    forest.iter().find_map(|root| root.find(id))
}

pub fn stats(forest: &[FolderTreeNode]) -> TreeStats {
    fn walk(node: &FolderTreeNode, depth: usize, stats: &mut TreeStats) {
        stats.folder_count += 1;
        stats.max_depth = stats.max_depth.max(depth);
        for child in &node.children {
            walk(child, depth + 1, stats);
        }
    }
    let mut stats = TreeStats::default();
    for root in forest {
        stats.document_count += root.total_document_count;
        stats.total_size_bytes += root.total_size_bytes;
        walk(root, 0, &mut stats);
    }
    stats
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFolderRequest {
    pub name: String,
    pub parent_id: Option<String>,
    pub metadata: Option<FolderMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub metadata: FolderMetadata,
    pub children: Vec<FolderNode>,
}

/// Builds the folder forest from a flat list.
///
/// One pass indexes parent -> children, then an explicit-stack walk assembles
/// the nodes bottom-up. A folder whose parent is not in the list becomes a
/// root, and a parent cycle is cut at the first folder reached twice.
/// Siblings are sorted by name, then id.
pub fn build_folder_tree<F>(folders: Vec<Folder>, mut metadata_of: F) -> Vec<FolderNode>
where
    F: FnMut(&Folder) -> FolderMetadata,
{
    let known: HashMap<String, usize> = folders
        .iter()
        .enumerate()
        .map(|(idx, f)| (f.id.clone(), idx))
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (idx, folder) in folders.iter().enumerate() {
        match folder.parent_id.as_ref().and_then(|p| known.get(p)) {
            Some(&parent) if parent != idx => children.entry(parent).or_default().push(idx),
            _ => roots.push(idx),
        }
    }

    let sort_key = |idx: &usize| (folders[*idx].name.clone(), folders[*idx].id.clone());
    roots.sort_by_key(sort_key);
    for list in children.values_mut() {
        list.sort_by_key(sort_key);
    }

    let mut built: Vec<Option<FolderNode>> = vec![None; folders.len()];
    let mut visited = vec![false; folders.len()];
    let mut forest = Vec::with_capacity(roots.len());

    for root in roots {
        visited[root] = true;
        forest.extend(walk(root, &folders, &children, &mut visited, &mut built, &mut metadata_of));
    }

    // Folders caught in a parent cycle are unreachable from any root.
    for idx in 0..folders.len() {
        if !visited[idx] {
            visited[idx] = true;
            forest.extend(walk(idx, &folders, &children, &mut visited, &mut built, &mut metadata_of));
        }
    }

    forest
}

fn walk<F>(
    root: usize,
    folders: &[Folder],
    children: &HashMap<usize, Vec<usize>>,
    visited: &mut [bool],
    built: &mut [Option<FolderNode>],
    metadata_of: &mut F,
) -> Option<FolderNode>
where
    F: FnMut(&Folder) -> FolderMetadata,
{
    // (node, children already pushed)
    let mut stack = vec![(root, false)];
    while let Some((idx, expanded)) = stack.pop() {
        let kids = children.get(&idx).map(Vec::as_slice).unwrap_or(&[]);
        if !expanded {
            stack.push((idx, true));
            for &child in kids.iter().rev() {
                if !visited[child] {
                    visited[child] = true;
                    stack.push((child, false));
                }
            }
            continue;
        }

        let folder = &folders[idx];
        let node = FolderNode {
            id: folder.id.clone(),
            name: folder.name.clone(),
            metadata: metadata_of(folder),
            children: kids.iter().filter_map(|&child| built[child].take()).collect(),
        };
        built[idx] = Some(node);
    }
    built[root].take()
}

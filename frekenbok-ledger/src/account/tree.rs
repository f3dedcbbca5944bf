use crate::primitives::*;

use super::entity::TreePosition;

/// Checks the nested-set invariants of one complete tree.
///
/// `nodes` must hold every node of a single tree. Each range must be well
/// formed, ranges must either nest or be disjoint, depth must match the
/// number of enclosing ranges and the boundaries must cover `1..=2n` exactly.
pub(crate) fn check_tree(tree_id: TreeId, nodes: &[TreePosition]) -> Result<(), String> {
    let mut sorted: Vec<_> = nodes.to_vec();
    sorted.sort_by_key(|node| node.lft);

    let mut boundaries = Vec::with_capacity(sorted.len() * 2);
    let mut open: Vec<TreePosition> = Vec::new();
    for node in sorted.iter() {
        if node.tree_id != tree_id {
            return Err(format!("node at {} belongs to tree {}", node.lft, node.tree_id));
        }
        if !node.is_well_formed() {
            return Err(format!(
                "malformed range ({}, {}) in tree {tree_id}",
                node.lft, node.rgt
            ));
        }
        while open.last().map(|top| top.rgt < node.lft).unwrap_or(false) {
            open.pop();
        }
        match open.last() {
            Some(parent) if node.rgt > parent.rgt => {
                return Err(format!(
                    "range ({}, {}) overlaps ({}, {}) in tree {tree_id}",
                    node.lft, node.rgt, parent.lft, parent.rgt
                ));
            }
            None if node.lft != 1 => {
                return Err(format!(
                    "tree {tree_id} has a second top level range starting at {}",
                    node.lft
                ));
            }
            _ => (),
        }
        if node.depth != open.len() as i64 {
            return Err(format!(
                "node ({}, {}) has depth {} but {} ancestors in tree {tree_id}",
                node.lft,
                node.rgt,
                node.depth,
                open.len()
            ));
        }
        boundaries.push(node.lft);
        boundaries.push(node.rgt);
        open.push(*node);
    }

    boundaries.sort_unstable();
    for (expected, boundary) in (1..).zip(boundaries.iter()) {
        if *boundary != expected {
            return Err(format!(
                "tree {tree_id} has a gap or duplicate boundary at {expected}"
            ));
        }
    }
    Ok(())
}

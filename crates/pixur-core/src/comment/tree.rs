//! Assembles the flat comment list into a reply tree.

use super::model::{Comment, CommentNode};
use crate::pic::CommentId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Ways a comment list can break the tree contract.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentTreeError {
    /// An id appears twice, or a comment claims the root id.
    #[error("comment {0} appears more than once")]
    DuplicateComment(CommentId),

    /// A comment points at a parent that is not in the list.
    #[error("comment {comment_id} references unknown parent {parent_id}")]
    UnknownParent {
        comment_id: CommentId,
        parent_id: CommentId,
    },

    /// Some comments can't be reached from the root (cyclic parentage).
    #[error("{unreachable} comments are not reachable from the root")]
    Cycle { unreachable: usize },
}

struct Frame {
    comment: Option<Comment>,
    pending: std::vec::IntoIter<Comment>,
    built: Vec<CommentNode>,
}

impl Frame {
    fn new(comment: Option<Comment>, children: Vec<Comment>) -> Self {
        Self {
            comment,
            pending: children.into_iter(),
            built: Vec::new(),
        }
    }
}

/// Builds the reply tree below the synthetic root [`CommentId::ZERO`].
///
/// The API lists comments in post-order (replies before the comment they
/// answer). Siblings come out in reverse list order, so the newest reply
/// ends up first. Runs in linear time.
///
/// # Errors
///
/// Returns a [`CommentTreeError`] instead of a partial tree when an id is
/// repeated, a parent is missing, or parentage is cyclic.
pub fn build_comment_tree(comments: Vec<Comment>) -> Result<Vec<CommentNode>, CommentTreeError> {
    let total = comments.len();

    let mut ids = HashSet::with_capacity(total);
    for comment in &comments {
        if comment.comment_id.is_zero() || !ids.insert(comment.comment_id) {
            return Err(CommentTreeError::DuplicateComment(comment.comment_id));
        }
    }

    let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    for comment in comments.into_iter().rev() {
        let parent_id = comment.comment_parent_id;
        if !parent_id.is_zero() && !ids.contains(&parent_id) {
            return Err(CommentTreeError::UnknownParent {
                comment_id: comment.comment_id,
                parent_id,
            });
        }
        children.entry(parent_id).or_default().push(comment);
    }

    let root_children = children.remove(&CommentId::ZERO).unwrap_or_default();
    let mut stack = vec![Frame::new(None, root_children)];
    let mut roots = Vec::new();
    let mut placed = 0;

    while let Some(frame) = stack.last_mut() {
        if let Some(next) = frame.pending.next() {
            let replies = children.remove(&next.comment_id).unwrap_or_default();
            stack.push(Frame::new(Some(next), replies));
            continue;
        }

        let Some(finished) = stack.pop() else { break };
        match finished.comment {
            Some(comment) => {
                placed += 1;
                let node = CommentNode {
                    comment,
                    children: finished.built,
                };
                if let Some(parent) = stack.last_mut() {
                    parent.built.push(node);
                }
            }
            None => roots = finished.built,
        }
    }

    if placed != total {
        return Err(CommentTreeError::Cycle {
            unreachable: total - placed,
        });
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64, parent: u64) -> Comment {
        Comment::new(CommentId(id), CommentId(parent), format!("comment {}", id))
    }

    fn ids(nodes: &[CommentNode]) -> Vec<u64> {
        nodes.iter().map(|n| n.id().value()).collect()
    }

    #[test]
    fn test_post_order_input_builds_tree() {
        let tree = build_comment_tree(vec![comment(3, 1), comment(2, 0), comment(1, 0)]).unwrap();

        assert_eq!(ids(&tree), vec![1, 2]);
        assert_eq!(ids(&tree[0].children), vec![3]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_empty_input_builds_empty_tree() {
        assert!(build_comment_tree(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_deep_nesting() {
        // 4 -> 3 -> 2 -> 1 -> root, listed leaf first.
        let tree = build_comment_tree(vec![
            comment(4, 3),
            comment(3, 2),
            comment(2, 1),
            comment(1, 0),
        ])
        .unwrap();

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(tree[0].subtree_len(), 4);
        assert_eq!(ids(&tree[0].children[0].children[0].children), vec![4]);
    }

    #[test]
    fn test_siblings_come_out_in_reverse_list_order() {
        let tree = build_comment_tree(vec![
            comment(5, 1),
            comment(4, 1),
            comment(1, 0),
        ])
        .unwrap();

        assert_eq!(ids(&tree[0].children), vec![4, 5]);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let err = build_comment_tree(vec![comment(2, 9), comment(1, 0)]).unwrap_err();
        assert_eq!(
            err,
            CommentTreeError::UnknownParent {
                comment_id: CommentId(2),
                parent_id: CommentId(9),
            }
        );
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = build_comment_tree(vec![comment(1, 0), comment(1, 0)]).unwrap_err();
        assert_eq!(err, CommentTreeError::DuplicateComment(CommentId(1)));

        let err = build_comment_tree(vec![comment(0, 0)]).unwrap_err();
        assert_eq!(err, CommentTreeError::DuplicateComment(CommentId::ZERO));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = build_comment_tree(vec![comment(2, 3), comment(3, 2), comment(1, 0)]).unwrap_err();
        assert_eq!(err, CommentTreeError::Cycle { unreachable: 2 });
    }
}

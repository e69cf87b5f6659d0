//! Picture comments and the reply tree built from them.

mod model;
mod tree;

pub use model::{Comment, CommentNode};
pub use tree::{CommentTreeError, build_comment_tree};

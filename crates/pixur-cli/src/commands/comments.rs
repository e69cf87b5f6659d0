use super::{parse_comment_id, parse_pic_id};
use crate::context::AppContext;
use anyhow::Result;
use pixur_core::comment::CommentNode;
use pixur_core::pic::CommentId;

pub async fn thread(app: &AppContext, id: &str) -> Result<()> {
    let tree = app.comments.comment_tree(parse_pic_id(id)?).await?;
    if tree.is_empty() {
        println!("No comments.");
        return Ok(());
    }
    for node in &tree {
        print_node(node, 0);
    }
    Ok(())
}

pub async fn add(app: &AppContext, id: &str, parent: Option<&str>, text: &str) -> Result<()> {
    let pic_id = parse_pic_id(id)?;
    let parent_id = match parent {
        Some(raw) => parse_comment_id(raw)?,
        None => CommentId::ZERO,
    };

    let comment = app.comments.add_comment(pic_id, parent_id, text).await?;
    println!("✅ Added comment {} on {}", comment.comment_id, pic_id);
    Ok(())
}

fn print_node(node: &CommentNode, depth: usize) {
    println!("{}[{}] {}", "  ".repeat(depth), node.id(), node.comment.text);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

pub mod auth;
pub mod comments;
pub mod pics;

use anyhow::{Context, Result};
use pixur_core::pic::{CommentId, PicId};

pub fn parse_pic_id(raw: &str) -> Result<PicId> {
    raw.parse()
        .with_context(|| format!("Invalid picture id '{}'", raw))
}

pub fn parse_comment_id(raw: &str) -> Result<CommentId> {
    raw.parse()
        .with_context(|| format!("Invalid comment id '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_pic_id(&PicId::new(300).to_string()).unwrap(), PicId::new(300));
        assert!(parse_pic_id("").is_err());
        assert!(parse_comment_id("!").is_err());
    }
}

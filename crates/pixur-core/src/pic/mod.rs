//! Pictures, index pages, and the id codec they share.

mod id;
mod model;
pub mod varint;

pub use id::{CommentId, PicId, TagId};
pub use model::{
    DeletionReason, Direction, NewPic, Page, PageKey, Pic, PicCommentList, PicDetails, PicKind,
    PicTag, SoftDeleteRequest, UploadFile, VIDEO_MIME, VoteDirection,
};
pub use varint::VarintError;

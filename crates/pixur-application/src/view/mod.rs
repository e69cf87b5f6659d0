//! Stateful view models the front ends drive.

mod pager;
mod quick_viewer;
mod sequence;
mod viewer;

pub use pager::IndexPager;
pub use quick_viewer::{QuickViewer, REJECT_DETAILS};
pub use sequence::{LoadOutcome, LoadSequence};
pub use viewer::{OpenPic, PicViewer};

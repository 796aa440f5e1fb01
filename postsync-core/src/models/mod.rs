mod front_matter;
mod post;

pub use front_matter::{FrontMatter, FrontMatterValue};
pub use post::{Post, PostStatus, SyncState};

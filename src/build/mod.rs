mod clean;
mod compile;
mod discover;
mod feedback;
mod link;
mod rebuild;

pub use clean::remove_dir;
pub use compile::{CompileRequest, compile};
pub use discover::find_files_by_extension;
pub use feedback::FeedbackAnalyzer;
pub use link::{LinkOutcome, LinkRequest, link};
pub use rebuild::{OBJECT_SUFFIX, SourceObjectPair, needs_rebuild, object_path};

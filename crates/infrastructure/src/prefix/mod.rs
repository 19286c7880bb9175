pub mod cache;
pub mod file_source;

pub use cache::PrefixCache;
pub use file_source::FilePrefixSource;

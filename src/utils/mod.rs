pub mod files;

pub use files::RegexFileResolver;

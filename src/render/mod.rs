//! Trace presentation variants behind a common seam.
pub mod grid;
pub mod scope;
pub mod strip;

pub use scope::ScopeRenderer;
pub use strip::StripRenderer;

pub mod backup;
pub mod common;
pub mod completions;
pub mod export;
pub mod history;
pub mod list;
pub mod prune;
pub mod restore;

pub mod github_api;
pub mod github_types;

pub mod article;
pub mod digest;
pub mod profile;

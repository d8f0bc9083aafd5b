pub mod repositories;

pub use repositories::{InMemoryProfileStore, ProfileStore, StoreStats};

//! Infrastructure layer: directory storage, external services, demo data.

pub mod ip_lookup;
pub mod seed;
pub mod store;

pub use ip_lookup::{HttpIpLookup, IpLookupError, PublicIpLookup, StaticIpLookup};
pub use seed::{DEMO_PASSWORD, SeedError, SeedSummary, seed_demo_data};
pub use store::{
    DirectoryStore, InMemoryDirectoryStore, PostgresDirectoryStore, StoreError, UserQuery,
};

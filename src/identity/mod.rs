mod schema;
mod store;

pub use schema::IDENTITY_VERSIONED_SCHEMAS;
pub use store::{
    compute_checksum, is_synthetic, synthetic_id, IdentityMapping, IdentityStore,
    SYNTHETIC_PREFIX,
};

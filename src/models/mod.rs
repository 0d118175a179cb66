pub mod identity;
pub mod quota;

pub use identity::{Identity, IdentityKind, IntegrationEndpoints, NewIdentity, QuotaLimit};
pub use quota::QuotaStatus;

pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod permissions;

pub use extractors::{AuthUser, MaybeAuthUser};
pub use permissions::Actor;

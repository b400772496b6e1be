//! Bearer-token authentication. Tokens are issued elsewhere; this service
//! only checks them and resolves the owner id every record is scoped to.

mod claims;
pub mod jwt;

pub use jwt::AuthUser;

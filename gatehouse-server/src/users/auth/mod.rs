pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod permission_middleware;

pub use identity::{CurrentUser, Identity};
pub use middleware::auth_middleware;
pub use permission_middleware::require_permission;

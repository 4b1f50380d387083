//! Services composed from the repository ports.

pub mod access_control;
pub mod auth_service;
pub mod rbac_bootstrap;
pub mod unit_of_work;
pub mod user_service;

pub use access_control::AccessControl;
pub use auth_service::AuthService;
pub use rbac_bootstrap::RbacBootstrapService;
pub use unit_of_work::AppUnitOfWork;
pub use user_service::UserService;

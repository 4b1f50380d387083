pub mod rbac;
pub mod users;
pub mod validation;

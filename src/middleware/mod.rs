pub mod auth;
pub mod response;
pub mod school;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use school::{require_school_middleware, ActiveSchool};

pub mod permission_service;
pub mod role_service;
pub mod school_service;
pub mod settings_service;
pub mod user_service;

pub use permission_service::PermissionService;
pub use role_service::RoleService;
pub use school_service::SchoolService;
pub use settings_service::SettingsService;
pub use user_service::UserService;

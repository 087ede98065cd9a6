pub mod permission;
pub mod profile;
pub mod role;
pub mod school;
pub mod setting;
pub mod user;

pub use permission::Permission;
pub use profile::Profile;
pub use role::Role;
pub use school::School;
pub use setting::Setting;
pub use user::User;

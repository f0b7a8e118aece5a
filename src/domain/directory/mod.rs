//! Directory records - users and groups owned by the external directory.

mod group;
mod user;

pub use group::Group;
pub use user::User;

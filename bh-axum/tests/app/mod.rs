mod application;
mod permissions;

pub use application::{T0, TestApp};
pub use permissions::Permissions;

// User domain module
// Account entity, signup validation and profile value objects

#![allow(clippy::module_inception)]

pub mod user;
pub mod value_objects;

pub use user::{
    password_messages, NewUser, Registration, ReviewAuthor, User, UserPatch, UserSummary,
};
pub use value_objects::{Email, Role};

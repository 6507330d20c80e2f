mod auth;
mod output;
pub mod ui;
mod users;

pub use auth::{login, me, register, verify, verify_token};
pub use output::OutputFormat;
pub use users::{create_user, delete_user, get_user, list_users, update_user, NewUserArgs};

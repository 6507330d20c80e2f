mod auth;
mod health;
mod me;
mod users;

pub use auth::{login, register, verify, verify_token};
pub use health::{handler_404, health};
pub use me::{change_my_password, get_me};
pub use users::{create_user, delete_user, get_user, list_users, update_user};

//! Core library for the identity service: staged registration, verification codes,
//! token issuance and permission checks.

pub mod cache;
mod config;
mod error;
pub mod notify;
pub mod store;
pub mod user;

pub use cache::{CodePurpose, EphemeralCache, MemoryCache};
pub use config::AuthConfig;
pub use error::{IdentityError, Result};
pub use notify::{LogNotifier, MemoryNotifier, Notifier, NotifyError, SendEmailRequest};
pub use store::{
    FilePermissionStore, FileUserStore, MemoryPermissionStore, MemoryUserStore, PermissionRule,
    PermissionStore, StoreError, UserStore,
};
pub use user::{
    AuthService, AuthSession, CreateUserRequest, IssuedToken, ListUsersParams, LoginRequest,
    RegisterRequest, TokenCheck, TokenClaims, User, UserPage, UserSummary, UserType, UserUpdate,
    VerifyRequest, VerifyTokenRequest,
};

//! 用户认证与授权模块

mod auth;
mod crypto;
mod manager;
mod models;
mod password;
mod token;


pub use crypto::{check_password, codes_match, generate_random_code, hash_password};
pub use manager::AuthService;
pub use models::{
    AuthSession, CreateUserRequest, ListUsersParams, LoginRequest, NewUser, RegisterRequest,
    TokenCheck, User, UserPage, UserSummary, UserType, UserUpdate, VerifyRequest,
    VerifyTokenRequest,
};
pub use token::{IssuedToken, TokenClaims, TokenIssuer};

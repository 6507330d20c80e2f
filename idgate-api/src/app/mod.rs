mod error;
mod extract;
mod handlers;
mod middleware;
mod notifier;
mod rate_limit;
mod router;
mod state;


pub use notifier::WebhookNotifier;
pub use rate_limit::RateLimiter;
pub use router::app_router;
pub use state::AppState;

// Middleware modules
// Bearer token validation for protected routes

pub mod auth;
pub mod auth_middleware;

pub use auth::AuthenticatedAccount;
pub use auth_middleware::auth_middleware;

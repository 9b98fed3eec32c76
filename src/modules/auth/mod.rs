pub mod flow;
pub mod gate;
pub mod password;
pub mod tokens;

// Re-export the main types and functions
pub use flow::{AuthError, AuthService, LoginResponse};
pub use gate::authenticate_request;
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use tokens::{IssuedToken, SessionClaims, TokenIssuer};

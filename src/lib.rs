// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{
    auth,
    config,
    payment,
    security,
    store,
    utils,
};

// Re-export commonly used types
pub use modules::auth::flow::{AuthError, AuthService, LoginResponse};
pub use modules::auth::tokens::{IssuedToken, SessionClaims, TokenIssuer};
pub use modules::config::Config;
pub use modules::payment::transaction::{PaymentError, PaymentService, Receipt};
pub use modules::store::{Money, Payment, RevokedToken, Store, StoreError, User};

// Constants
pub const MAX_FAILED_LOGINS: u32 = 5;
pub const LOCKOUT_DURATION_SECS: u64 = 600;
pub const TOKEN_DURATION_SECS: u64 = 7200;
pub const TOKEN_CLOCK_SKEW_SECS: u64 = 10;
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const CONFIG_FILE: &str = "paygate.json";

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;

pub mod keyring;

pub use keyring::SigningKey;

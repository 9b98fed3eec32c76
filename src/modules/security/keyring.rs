use keyring::Entry;
use rand::random;
use std::io;

/// Handles secure storage and retrieval of the token signing secret.
/// The secret never lands in the config file or the store; it lives in the
/// system keyring, shared with whatever gate verifies the tokens.
pub struct SigningKey {
    keyring: Entry,
}

impl SigningKey {
    /// Set up access to the system keyring under this application's identifier
    pub fn new() -> Self {
        Self {
            keyring: Entry::new("paygate", "signing-key")
                .expect("Failed to create keyring entry"),
        }
    }

    /// Store a new signing secret in the system's secure storage
    pub fn store_key(&self, key: &[u8]) -> io::Result<()> {
        let encoded = hex::encode(key);
        self.keyring
            .set_password(&encoded)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    /// Retrieve the signing secret as raw bytes
    pub fn get_key(&self) -> io::Result<Vec<u8>> {
        let encoded = self
            .keyring
            .get_password()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        hex::decode(encoded).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    /// Generate and store a 32-byte secret on first use, so the issuer
    /// always has keyed-MAC material available
    pub fn initialize_if_needed(&self) -> io::Result<()> {
        if self.keyring.get_password().is_err() {
            let new_key: Vec<u8> = (0..32).map(|_| random::<u8>()).collect();
            self.store_key(&new_key)?;
            log::info!("new token signing secret generated and stored in system keyring");
        }
        Ok(())
    }
}

impl Default for SigningKey {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The real keyring is a machine-global resource, so tests run against an
    // in-memory stand-in with the same surface.
    struct MockKeyring {
        data: Option<String>,
    }

    impl MockKeyring {
        fn new() -> Self {
            Self { data: None }
        }

        fn set_password(&mut self, password: &str) -> Result<(), String> {
            self.data = Some(password.to_string());
            Ok(())
        }

        fn get_password(&self) -> Result<String, String> {
            self.data.clone().ok_or_else(|| "no secret set".to_string())
        }
    }

    struct MockSigningKey {
        keyring: MockKeyring,
    }

    impl MockSigningKey {
        fn new() -> Self {
            Self {
                keyring: MockKeyring::new(),
            }
        }

        fn store_key(&mut self, key: &[u8]) -> io::Result<()> {
            self.keyring
                .set_password(&hex::encode(key))
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        }

        fn get_key(&self) -> io::Result<Vec<u8>> {
            let encoded = self
                .keyring
                .get_password()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            hex::decode(encoded).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
        }

        fn initialize_if_needed(&mut self) -> io::Result<()> {
            if self.keyring.get_password().is_err() {
                let new_key: Vec<u8> = (0..32).map(|_| random::<u8>()).collect();
                self.store_key(&new_key)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_signing_key_lifecycle() {
        let mut signing_key = MockSigningKey::new();

        // Initially, there is no secret
        assert!(signing_key.get_key().is_err());

        // Initialization creates a 32-byte secret
        assert!(signing_key.initialize_if_needed().is_ok());
        let key = signing_key.get_key().unwrap();
        assert_eq!(key.len(), 32);

        // Re-initialization keeps the existing secret
        signing_key.initialize_if_needed().unwrap();
        assert_eq!(signing_key.get_key().unwrap(), key);

        // An explicitly stored secret round-trips
        let replacement: Vec<u8> = (0..32).map(|_| 0x5A).collect();
        signing_key.store_key(&replacement).unwrap();
        assert_eq!(signing_key.get_key().unwrap(), replacement);
    }
}

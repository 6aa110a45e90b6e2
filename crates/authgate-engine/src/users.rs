//! User records and storage.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use authgate_core::{EngineError, User};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A stored user, including the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user ID.
    pub id: String,
    /// Email address used to log in.
    pub email: String,
    /// Argon2 password hash.
    pub password_hash: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a new record with a freshly hashed password.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn new(
        email: impl Into<String>,
        password: &str,
        roles: Vec<String>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            id: format!("user_{}", uuid_v4()),
            email: email.into(),
            password_hash: hash_password(password)?,
            roles,
            email_verified: false,
            created_at: Utc::now(),
        })
    }

    /// Verify a password against this record's hash.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCredentials`] if the password doesn't match.
    pub fn verify_password(&self, password: &str) -> Result<(), EngineError> {
        verify_password(password, &self.password_hash)
    }

    /// Replace the password.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<(), EngineError> {
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    /// The repository view of this user (no password hash).
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
            email_verified: self.email_verified,
            created_at: self.created_at,
        }
    }
}

/// User store backed by sled. Records are keyed by ID in `users`; the
/// unique email index lives in `users_by_email`.
pub struct UserStore {
    tree: sled::Tree,
    by_email: sled::Tree,
}

impl UserStore {
    /// Open the user trees of an existing database.
    ///
    /// # Errors
    ///
    /// Returns error if a tree cannot be opened.
    pub fn open(db: &sled::Db) -> Result<Self, EngineError> {
        let tree = db
            .open_tree("users")
            .map_err(|e| EngineError::Storage(format!("Failed to open users tree: {e}")))?;
        let by_email = db
            .open_tree("users_by_email")
            .map_err(|e| EngineError::Storage(format!("Failed to open email index: {e}")))?;

        Ok(Self { tree, by_email })
    }

    /// Check if any users exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Count total users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree.len()
    }

    /// Create a new user.
    ///
    /// The email index entry is claimed atomically, so two concurrent
    /// registrations for the same address cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmailAlreadyRegistered`] if the email is taken,
    /// or a storage error.
    pub fn create(&self, record: &UserRecord) -> Result<(), EngineError> {
        self.by_email
            .compare_and_swap(
                record.email.as_bytes(),
                None as Option<&[u8]>,
                Some(record.id.as_bytes()),
            )
            .map_err(|e| EngineError::Storage(format!("Index error: {e}")))?
            .map_err(|_| EngineError::EmailAlreadyRegistered(record.email.clone()))?;

        self.put(record)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get(&self, id: &str) -> Result<Option<UserRecord>, EngineError> {
        match self.tree.get(id.as_bytes()) {
            Ok(Some(value)) => {
                let record: UserRecord = serde_json::from_slice(&value)
                    .map_err(|e| EngineError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(EngineError::Storage(format!("Get error: {e}"))),
        }
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, EngineError> {
        match self.by_email.get(email.as_bytes()) {
            Ok(Some(id_bytes)) => {
                let id = String::from_utf8_lossy(&id_bytes);
                self.get(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(EngineError::Storage(format!("Index lookup error: {e}"))),
        }
    }

    /// Update an existing user.
    ///
    /// # Errors
    ///
    /// Returns error if the user doesn't exist or storage fails.
    pub fn update(&self, record: &UserRecord) -> Result<(), EngineError> {
        if self.get(&record.id)?.is_none() {
            return Err(EngineError::InvalidUser(format!("id: {}", record.id)));
        }

        self.put(record)
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list(&self) -> Result<Vec<UserRecord>, EngineError> {
        let mut users = Vec::new();

        for result in self.tree.iter() {
            let (_, value) =
                result.map_err(|e| EngineError::Storage(format!("Iter error: {e}")))?;
            let record: UserRecord = serde_json::from_slice(&value)
                .map_err(|e| EngineError::Storage(format!("Deserialization error: {e}")))?;
            users.push(record);
        }

        Ok(users)
    }

    fn put(&self, record: &UserRecord) -> Result<(), EngineError> {
        let value = serde_json::to_vec(record)
            .map_err(|e| EngineError::Storage(format!("Serialization error: {e}")))?;

        self.tree
            .insert(record.id.as_bytes(), value)
            .map_err(|e| EngineError::Storage(format!("Insert error: {e}")))?;

        self.tree
            .flush()
            .map_err(|e| EngineError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, EngineError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| EngineError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), EngineError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| EngineError::Internal(format!("Invalid hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| EngineError::InvalidCredentials)
}

/// Generate a UUID v4 string.
fn uuid_v4() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);

    // Set version (4) and variant bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        UserStore::open(&db).unwrap()
    }

    #[test]
    fn test_record_creation() {
        let record = UserRecord::new("a@b.com", "secret1", vec!["user".to_string()]).unwrap();
        assert!(record.id.starts_with("user_"));
        assert_eq!(record.id.len(), "user_".len() + 36);
        assert!(!record.email_verified);
        assert_ne!(record.password_hash, "secret1");
    }

    #[test]
    fn test_password_verification() {
        let mut record = UserRecord::new("a@b.com", "secret1", Vec::new()).unwrap();
        assert!(record.verify_password("secret1").is_ok());
        assert!(matches!(
            record.verify_password("wrong"),
            Err(EngineError::InvalidCredentials)
        ));

        record.set_password("secret2").unwrap();
        assert!(record.verify_password("secret1").is_err());
        assert!(record.verify_password("secret2").is_ok());
    }

    #[test]
    fn test_user_store() {
        let store = store();
        assert!(store.is_empty());

        let record = UserRecord::new("a@b.com", "secret1", vec!["user".to_string()]).unwrap();
        store.create(&record).unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.get(&record.id).unwrap().unwrap().email, "a@b.com");
        assert_eq!(
            store.get_by_email("a@b.com").unwrap().unwrap().id,
            record.id
        );
        assert!(store.get_by_email("x@y.com").unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email() {
        let store = store();
        store
            .create(&UserRecord::new("a@b.com", "secret1", Vec::new()).unwrap())
            .unwrap();

        let result = store.create(&UserRecord::new("a@b.com", "secret2", Vec::new()).unwrap());
        assert!(matches!(result, Err(EngineError::EmailAlreadyRegistered(e)) if e == "a@b.com"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_index_keys_are_not_user_ids() {
        let store = store();
        let record = UserRecord::new("a@b.com", "secret1", Vec::new()).unwrap();
        store.create(&record).unwrap();

        assert!(store.get("a@b.com").unwrap().is_none());
        assert!(store.get("idx:email:a@b.com").unwrap().is_none());
        assert!(store.get_by_email(&record.id).unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update() {
        let store = store();
        let mut record = UserRecord::new("a@b.com", "secret1", Vec::new()).unwrap();
        store.create(&record).unwrap();

        record.email_verified = true;
        store.update(&record).unwrap();
        assert!(store.get(&record.id).unwrap().unwrap().email_verified);

        let ghost = UserRecord::new("ghost@b.com", "secret1", Vec::new()).unwrap();
        assert!(store.update(&ghost).is_err());
    }
}

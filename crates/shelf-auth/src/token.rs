use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use shelf_types::claim::TimeLimited;
use tracing::debug;

use crate::error::Result;

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// Issues and validates HS256 signed tokens with fixed validity
pub struct TokenManager {
    keys: Keys,
    default_validity: std::time::Duration,
    header: Header,
    validation: Validation,
}

impl TokenManager {
    pub fn new(secret: impl AsRef<[u8]>, default_validity: std::time::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let header = Header::new(Algorithm::HS256);
        Self {
            keys: Keys::new(secret),
            default_validity,
            header,
            validation,
        }
    }

    pub fn issue(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let now = std::time::SystemTime::now();
        let validity = now + self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    #[cfg(any(test, feature = "e2e-tests"))]
    pub fn issue_expired(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let now = std::time::SystemTime::now();
        let validity = now - self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    pub fn validate<T>(&self, token: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let data = decode::<T>(token, &self.keys.decoding, &self.validation).inspect_err(|e| {
            debug!(error = %e, "Token rejected");
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use shelf_types::claim::ApiClaim;
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn test_token() {
        let claim = ApiClaim::new_expired(123);
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue(claim).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        assert!(res.is_ok());
        let claim = res.unwrap();
        assert_eq!(claim.sub, "123");
        assert_eq!(claim.user_id(), Some(123));
        assert!(claim.exp - claim.iat >= 3599);
    }

    #[test]
    #[traced_test]
    fn test_token_expiration() {
        let claim = ApiClaim::new_expired(123);
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue_expired(claim).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        let err = res.unwrap_err();
        assert!(err.is_expired());
    }

    #[test]
    fn test_token_wrong_secret() {
        let claim = ApiClaim::new_expired(7);
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let other = TokenManager::new("other secret", std::time::Duration::from_secs(3600));
        let token = manager.issue(claim).unwrap();
        let err = other.validate::<ApiClaim>(&token).unwrap_err();
        assert!(!err.is_expired());
        assert!(other.validate::<ApiClaim>("not.a.token").is_err());
    }
}

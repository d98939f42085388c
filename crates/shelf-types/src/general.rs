use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Login name, any non-empty text up to 150 characters
#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct Username(#[garde(length(chars, min = 1, max = 150))] String);

impl FromStr for Username {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let username = Username(s.to_string());
        username.validate()?;
        Ok(username)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::Arbitrary;
    use quickcheck_macros::quickcheck;

    use super::*;

    const ALPHABET: &[char] = &[
        'a', 'b', 'c', 'x', 'y', 'z', 'A', 'Z', '0', '7', '9', '@', '.', '+', '-', '_',
    ];

    impl Arbitrary for Username {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let len = usize::arbitrary(g) % 150 + 1;
            let name: String = (0..len)
                .map(|_| *g.choose(ALPHABET).unwrap_or(&'a'))
                .collect();
            Username(name)
        }
    }

    #[quickcheck]
    fn test_valid_username_arbitrary(username: Username) {
        assert!(username.validate().is_ok());
    }

    #[test]
    fn test_valid_username() {
        let username = Username::from_str("reader.one@home").unwrap();
        assert_eq!(username.as_ref(), "reader.one@home");
    }

    #[test]
    fn test_free_form_username() {
        for name in ["with space", "semi;colon", "bad name!", "Čtenář"] {
            let username = Username::from_str(name).unwrap();
            assert_eq!(username.as_ref(), name);
        }
        assert!(Username::from_str(&"ž".repeat(150)).is_ok());
    }

    #[test]
    fn test_invalid_username() {
        assert!(Username::from_str("").is_err());
        assert!(Username::from_str(&"x".repeat(151)).is_err());
        assert!(Username("".to_string()).validate().is_err());
    }
}

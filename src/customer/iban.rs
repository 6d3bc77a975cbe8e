//! A validated IBAN newtype. No IBAN crate is part of the dependency stack, so the BBAN
//! checksum (ISO 7064 MOD 97-10) is implemented directly, following the same
//! private-field-plus-static-constructor shape used for other validated identifiers.

use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iban(String);

impl Iban {
    /// Normalizes whitespace/case and validates length, country code, and the MOD 97-10
    /// checksum. Does not check the country against any per-event allow-list; that check
    /// belongs to the caller, which knows the event's `sepa_allowed_country_codes`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized: String = raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
        if normalized.len() < 15 || normalized.len() > 34 {
            return Err(CoreError::invalid_argument("IBAN has an invalid length"));
        }
        if !normalized.chars().take(2).all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::invalid_argument("IBAN is missing a country code"));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::invalid_argument("IBAN contains invalid characters"));
        }
        if !Self::checksum_valid(&normalized) {
            return Err(CoreError::invalid_argument("IBAN checksum is invalid"));
        }
        Ok(Self(normalized))
    }

    pub fn country_code(&self) -> &str {
        &self.0[0..2]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rearranges to `BBAN + country code + check digits`, maps letters to `A=10..Z=35`,
    /// and checks the resulting decimal value mod 97 == 1.
    fn checksum_valid(iban: &str) -> bool {
        let rearranged = format!("{}{}", &iban[4..], &iban[0..4]);
        let mut remainder: u64 = 0;
        for c in rearranged.chars() {
            let value = if c.is_ascii_digit() { c.to_digit(10).unwrap() as u64 } else { (c as u64) - ('A' as u64) + 10 };
            remainder = if value >= 10 { (remainder * 100 + value) % 97 } else { (remainder * 10 + value) % 97 };
        }
        remainder == 1
    }
}

impl fmt::Display for Iban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Iban {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Iban> for String {
    fn from(value: Iban) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_known_valid_iban() {
        assert!(Iban::parse("DE89 3704 0044 0532 0130 00").is_ok());
    }

    #[test]
    fn rejects_a_bad_checksum() {
        assert!(Iban::parse("DE89370400440532013001").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Iban::parse("not-an-iban").is_err());
    }
}

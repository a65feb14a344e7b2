use rand::Rng;
use regex::Regex;

use crate::error::PatternError;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shape of an attendance code: `<PREFIX>-<SUFFIX>`, where the suffix is
/// [`CodePattern::MIN_SUFFIX`]..=[`CodePattern::MAX_SUFFIX`] ASCII letters or digits.
///
/// Matching is case-insensitive. Generated codes are always upper case.
#[derive(Debug, Clone)]
pub struct CodePattern {
    prefix: String,
    suffix_len: usize,
    direct: Regex,
    embedded: Regex,
}

impl CodePattern {
    pub const MIN_SUFFIX: usize = 4;
    pub const MAX_SUFFIX: usize = 32;

    pub fn new(prefix: &str, suffix_len: usize) -> Result<Self, PatternError> {
        let prefix = prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PatternError::InvalidPrefix(prefix));
        }
        if !(Self::MIN_SUFFIX..=Self::MAX_SUFFIX).contains(&suffix_len) {
            return Err(PatternError::InvalidLength {
                min: Self::MIN_SUFFIX,
                max: Self::MAX_SUFFIX,
                got: suffix_len,
            });
        }

        let body = format!(
            "{prefix}-[A-Z0-9]{{{},{}}}",
            Self::MIN_SUFFIX,
            Self::MAX_SUFFIX
        );
        // The prefix is alphanumeric, so neither pattern can fail to compile.
        let direct = Regex::new(&format!("(?i)^{body}$"))
            .map_err(|_| PatternError::InvalidPrefix(prefix.clone()))?;
        let embedded = Regex::new(&format!("(?i)(?:^|[^A-Z0-9])({body})(?:$|[^A-Z0-9])"))
            .map_err(|_| PatternError::InvalidPrefix(prefix.clone()))?;

        Ok(Self {
            prefix,
            suffix_len,
            direct,
            embedded,
        })
    }

    /// Pattern built from `CHECKIN_CODE_PREFIX` and `CHECKIN_CODE_LENGTH`.
    pub fn from_config() -> Result<Self, PatternError> {
        Self::new(
            &util::config::checkin_code_prefix(),
            util::config::checkin_code_length(),
        )
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True when the whole of `text` is a code.
    pub fn is_direct(&self, text: &str) -> bool {
        self.direct.is_match(text)
    }

    /// First code found inside `text`, upper-cased.
    pub fn find_in(&self, text: &str) -> Option<String> {
        self.embedded
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_ascii_uppercase())
    }

    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let suffix: String = (0..self.suffix_len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}-{}", self.prefix, suffix)
    }
}

//! Text encodings understood by file sources and `binary` casts.

use std::fmt;

use super::error::CastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Ascii,
    Utf8,
    Latin1,
}

impl Encoding {
    /// Looks up an encoding by its common names, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "ascii" | "us-ascii" => Some(Encoding::Ascii),
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CastError> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii => text
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Ok(c as u8)
                    } else {
                        Err(self.unencodable(c))
                    }
                })
                .collect(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| self.unencodable(c)))
                .collect(),
        }
    }

    /// Decodes bytes, returning `None` when they are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Encoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    fn unencodable(&self, c: char) -> CastError {
        CastError::Encoding {
            encoding: self.name().to_string(),
            message: format!("character {c:?} is out of range"),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Encoding::from_name("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("iso_8859_1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::from_name("ebcdic"), None);
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        assert_eq!(Encoding::Ascii.encode("abc").unwrap(), b"abc".to_vec());
        assert!(matches!(
            Encoding::Ascii.encode("zażółć"),
            Err(CastError::Encoding { .. })
        ));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(Encoding::Latin1.encode("é").unwrap(), vec![0xe9]);
        assert!(Encoding::Latin1.encode("€").is_err());
        assert_eq!(Encoding::Latin1.decode(&[0xe9]).unwrap(), "é");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(Encoding::Utf8.decode(&[0xff, 0xfe]), None);
        assert_eq!(Encoding::Ascii.decode(&[0x80]), None);
    }
}

use std::fmt;

/// Bitrate/format tier understood by the resolution upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// MP3 320
    Mp3 = 5,
    /// 16-bit / 44.1kHz
    Lossless = 6,
    /// 24-bit up to 96kHz
    HiRes96 = 7,
    /// 24-bit up to 192kHz
    #[default]
    HiRes192 = 27,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("quality must be one of 5, 6, 7 or 27 (got {0})")]
pub struct InvalidQuality(pub String);

impl Quality {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Parses the raw caller value; `None` means the default tier.
    pub fn from_request(raw: Option<&str>) -> Result<Self, InvalidQuality> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(s) => s
                .parse::<u32>()
                .map_err(|_| InvalidQuality(s.to_string()))
                .and_then(Self::try_from),
        }
    }
}

impl TryFrom<u32> for Quality {
    type Error = InvalidQuality;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            5 => Ok(Quality::Mp3),
            6 => Ok(Quality::Lossless),
            7 => Ok(Quality::HiRes96),
            27 => Ok(Quality::HiRes192),
            other => Err(InvalidQuality(other.to_string())),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_codes() {
        for code in [5, 6, 7, 27] {
            assert_eq!(Quality::try_from(code).unwrap().code(), code);
        }
    }

    #[test]
    fn test_default_is_highest() {
        assert_eq!(Quality::from_request(None).unwrap(), Quality::HiRes192);
        assert_eq!(Quality::from_request(Some("")).unwrap().code(), 27);
    }

    #[test]
    fn test_rejects_values_outside_the_set() {
        for raw in ["99", "0", "-5", "lossless", "27.0"] {
            let err = Quality::from_request(Some(raw)).unwrap_err();
            assert!(err.to_string().contains(raw), "input: {raw}");
        }
    }
}

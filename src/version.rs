//! # Version Strings
//!
//! Parsing, validation, comparison and serialization of the three version
//! flavors tracked by a stable-version manifest:
//!
//! - **OS**: `R<release>-<tip>.<branch>.<branchbranch>`, e.g. `R77-12371.52.22`.
//! - **Firmware**: `<platform>-firmware/R<release>-<tip>.<branch>.<branchbranch>`,
//!   e.g. `nami-firmware/R77-12371.52.0`.
//! - **Faft**: `<company>_<platform>.<tip>.<branch>.<branchbranch>`,
//!   e.g. `Google_Nami.8438.184.0`.
//!
//! Every numeric component is a non-negative integer written without leading
//! zeros, so `serialize(parse(s)) == s` for every accepted `s`. OS versions
//! are totally ordered on `(release, tip, branch, branchbranch)`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

static OS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^R(0|[1-9][0-9]*)-(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$")
        .expect("OS version pattern is valid")
});

static FIRMWARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Za-z0-9_]+)-firmware/R(0|[1-9][0-9]*)-(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$",
    )
    .expect("firmware version pattern is valid")
});

static FAFT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Za-z0-9]+)_([A-Za-z0-9_]+)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$",
    )
    .expect("faft version pattern is valid")
});

/// A parsed OS version. Field order defines the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion {
    pub release: u64,
    pub tip: u64,
    pub branch: u64,
    pub branchbranch: u64,
}

/// A parsed firmware bundle version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FirmwareVersion {
    pub platform: String,
    pub release: u64,
    pub tip: u64,
    pub branch: u64,
    pub branchbranch: u64,
}

/// A parsed faft (read-write firmware) version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FaftVersion {
    pub company: String,
    pub platform: String,
    pub tip: u64,
    pub branch: u64,
    pub branchbranch: u64,
}

fn invalid(kind: &str, s: &str) -> Error {
    Error::InvalidFormat {
        message: format!("invalid {} version {:?}", kind, s),
    }
}

fn number(caps: &Captures<'_>, idx: usize, kind: &str, s: &str) -> Result<u64> {
    caps.get(idx)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| invalid(kind, s))
}

fn text(caps: &Captures<'_>, idx: usize, kind: &str, s: &str) -> Result<String> {
    caps.get(idx)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| invalid(kind, s))
}

/// Parse an OS version such as `R77-12371.52.22`.
pub fn parse_os(s: &str) -> Result<OsVersion> {
    let caps = OS_RE.captures(s).ok_or_else(|| invalid("OS", s))?;
    Ok(OsVersion {
        release: number(&caps, 1, "OS", s)?,
        tip: number(&caps, 2, "OS", s)?,
        branch: number(&caps, 3, "OS", s)?,
        branchbranch: number(&caps, 4, "OS", s)?,
    })
}

/// Parse a firmware version such as `nami-firmware/R77-12371.52.0`.
pub fn parse_firmware(s: &str) -> Result<FirmwareVersion> {
    let caps = FIRMWARE_RE
        .captures(s)
        .ok_or_else(|| invalid("firmware", s))?;
    Ok(FirmwareVersion {
        platform: text(&caps, 1, "firmware", s)?,
        release: number(&caps, 2, "firmware", s)?,
        tip: number(&caps, 3, "firmware", s)?,
        branch: number(&caps, 4, "firmware", s)?,
        branchbranch: number(&caps, 5, "firmware", s)?,
    })
}

/// Parse a faft version such as `Google_Nami.8438.184.0`.
pub fn parse_faft(s: &str) -> Result<FaftVersion> {
    let caps = FAFT_RE.captures(s).ok_or_else(|| invalid("faft", s))?;
    Ok(FaftVersion {
        company: text(&caps, 1, "faft", s)?,
        platform: text(&caps, 2, "faft", s)?,
        tip: number(&caps, 3, "faft", s)?,
        branch: number(&caps, 4, "faft", s)?,
        branchbranch: number(&caps, 5, "faft", s)?,
    })
}

pub fn validate_os(s: &str) -> Result<()> {
    parse_os(s).map(|_| ())
}

pub fn validate_firmware(s: &str) -> Result<()> {
    parse_firmware(s).map(|_| ())
}

pub fn validate_faft(s: &str) -> Result<()> {
    parse_faft(s).map(|_| ())
}

/// Accepts any version that may appear in the firmware or faft sections of a
/// manifest: either a firmware bundle name or a read-write firmware string.
pub fn validate_firmware_like(s: &str) -> Result<()> {
    if FIRMWARE_RE.is_match(s) || FAFT_RE.is_match(s) {
        Ok(())
    } else {
        Err(invalid("firmware", s))
    }
}

pub fn serialize_os(v: &OsVersion) -> String {
    v.to_string()
}

pub fn serialize_firmware(v: &FirmwareVersion) -> String {
    v.to_string()
}

pub fn serialize_faft(v: &FaftVersion) -> String {
    v.to_string()
}

/// Compare two OS version strings. Both must be valid.
pub fn compare_os(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse_os(a)?.cmp(&parse_os(b)?))
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}-{}.{}.{}",
            self.release, self.tip, self.branch, self.branchbranch
        )
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-firmware/R{}-{}.{}.{}",
            self.platform, self.release, self.tip, self.branch, self.branchbranch
        )
    }
}

impl fmt::Display for FaftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}.{}.{}.{}",
            self.company, self.platform, self.tip, self.branch, self.branchbranch
        )
    }
}

impl std::str::FromStr for OsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_os(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os() {
        let v = parse_os("R77-12371.52.22").unwrap();
        assert_eq!(
            v,
            OsVersion {
                release: 77,
                tip: 12371,
                branch: 52,
                branchbranch: 22
            }
        );
        assert_eq!(serialize_os(&v), "R77-12371.52.22");
    }

    #[test]
    fn test_parse_os_rejects_deviations() {
        for bad in [
            "",
            "r77-12371.52.22",
            "R77-12371.52",
            "R77_12371.52.22",
            "R77-12371.52.x",
            "R077-12371.52.22",
            " R77-12371.52.22",
            "R77-12371.52.22\n",
        ] {
            assert!(
                matches!(parse_os(bad), Err(Error::InvalidFormat { .. })),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_firmware() {
        let v = parse_firmware("nami_ec-firmware/R77-12371.52.0").unwrap();
        assert_eq!(v.platform, "nami_ec");
        assert_eq!(v.release, 77);
        assert_eq!(v.branchbranch, 0);
        assert_eq!(serialize_firmware(&v), "nami_ec-firmware/R77-12371.52.0");
        assert!(parse_firmware("nami-firmware/77-12371.52.0").is_err());
        assert!(parse_firmware("na mi-firmware/R77-12371.52.0").is_err());
    }

    #[test]
    fn test_parse_faft() {
        let v = parse_faft("Google_Nami.8438.184.0").unwrap();
        assert_eq!(v.company, "Google");
        assert_eq!(v.platform, "Nami");
        assert_eq!(v.tip, 8438);
        assert_eq!(serialize_faft(&v), "Google_Nami.8438.184.0");

        let v = parse_faft("Google_Grunt_Ext.11031.81.0").unwrap();
        assert_eq!(v.platform, "Grunt_Ext");
        assert!(parse_faft("Google.8438.184.0").is_err());
        assert!(parse_faft("Google_Nami.8438.184").is_err());
    }

    #[test]
    fn test_validate_per_grammar() {
        assert!(validate_os("R77-12371.52.0").is_ok());
        assert!(validate_os("r77-12371.52.0").is_err());
        assert!(validate_firmware("nami-firmware/R77-12371.52.0").is_ok());
        assert!(validate_firmware("Google_Nami.8438.184.0").is_err());
        assert!(validate_faft("Google_Nami.8438.184.0").is_ok());
        assert!(validate_faft("Google_Nami.8438.184").is_err());
    }

    #[test]
    fn test_validate_firmware_like() {
        assert!(validate_firmware_like("Google_Nami.8438.184.0").is_ok());
        assert!(validate_firmware_like("nami-firmware/R77-12371.52.0").is_ok());
        assert!(validate_firmware_like("R77-12371.52.0").is_err());
        assert!(validate_firmware_like("xxx-yyy-zzz").is_err());
    }

    #[test]
    fn test_compare_os() {
        assert_eq!(
            compare_os("R77-12371.52.22", "R77-12371.99.22").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_os("R85-13310.91.0", "R85-13310.41.0").unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_os("R80-9.0.0", "R80-9.0.0").unwrap(),
            Ordering::Equal
        );
        // Numeric, not lexicographic
        assert_eq!(
            compare_os("R9-1.0.0", "R10-1.0.0").unwrap(),
            Ordering::Less
        );
        assert!(compare_os("R80-9.0.0", "garbage").is_err());
    }

    #[test]
    fn test_os_from_str() {
        let v: OsVersion = "R1-2.3.4".parse().unwrap();
        assert_eq!(v.to_string(), "R1-2.3.4");
    }
}

/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::version
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Native package version ordering. Replaces shelling out to
    `vercmp` with an in-process segment walk and provides the
    composite epoch:version-release type.

  Security / Safety Notes:
    Pure computation; no I/O performed in this module.

  Dependencies:
    None beyond std.

  Operational Scope:
    Used by constraint evaluation, repository resolution and the
    upgrade scanner for every version decision.

  Revision History:
    2026-10-16 COD  Replaced vercmp subprocess with native ordering.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic total ordering
    - Explicit parse errors naming the offending input
============================================================*/

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SynsyuError};

/// Compare two upstream version strings segment by segment.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut one = 0usize;
    let mut two = 0usize;

    while one < a.len() && two < b.len() {
        let sep_start_a = one;
        let sep_start_b = two;
        while one < a.len() && !a[one].is_ascii_alphanumeric() {
            one += 1;
        }
        while two < b.len() && !b[two].is_ascii_alphanumeric() {
            two += 1;
        }

        if one >= a.len() || two >= b.len() {
            break;
        }

        let skip_a = one - sep_start_a;
        let skip_b = two - sep_start_b;
        if skip_a != skip_b {
            // Longer separator run wins.
            return if skip_a > skip_b {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let numeric = a[one].is_ascii_digit();
        let end_a = run_end(a, one, numeric);
        let end_b = run_end(b, two, numeric);

        if end_b == two {
            // `b` has a segment of the other kind here; numeric dominates.
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let seg_a = &a[one..end_a];
        let seg_b = &b[two..end_b];
        let verdict = if numeric {
            compare_numeric(seg_a, seg_b)
        } else {
            seg_a.cmp(seg_b)
        };
        if verdict != Ordering::Equal {
            return verdict;
        }

        one = end_a;
        two = end_b;
    }

    let rest_a = &a[one..];
    let rest_b = &b[two..];
    if rest_a.is_empty() && rest_b.is_empty() {
        return Ordering::Equal;
    }

    // A trailing alpha segment never beats an exhausted side.
    let a_alpha = rest_a.first().is_some_and(u8::is_ascii_alphabetic);
    let b_alpha = rest_b.first().is_some_and(u8::is_ascii_alphabetic);
    if (rest_a.is_empty() && !b_alpha) || a_alpha {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn run_end(bytes: &[u8], start: usize, numeric: bool) -> usize {
    let mut end = start;
    while end < bytes.len()
        && (if numeric {
            bytes[end].is_ascii_digit()
        } else {
            bytes[end].is_ascii_alphabetic()
        })
    {
        end += 1;
    }
    end
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits
        .iter()
        .position(|d| *d != b'0')
        .unwrap_or(digits.len());
    &digits[first..]
}

/// Compare two raw `[epoch:]version[-release]` strings.
///
/// Releases are only compared when both sides carry one, matching how the
/// package manager treats an unqualified dependency version.
pub fn compare_evr(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (epoch_a, ver_a, rel_a) = split_evr(a);
    let (epoch_b, ver_b, rel_b) = split_evr(b);

    vercmp(epoch_a, epoch_b)
        .then_with(|| vercmp(ver_a, ver_b))
        .then_with(|| match (rel_a, rel_b) {
            (Some(ra), Some(rb)) => vercmp(ra, rb),
            _ => Ordering::Equal,
        })
}

fn split_evr(raw: &str) -> (&str, &str, Option<&str>) {
    let (epoch, rest) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) if raw.as_bytes()[idx] == b':' => (&raw[..idx], &raw[idx + 1..]),
        _ => ("0", raw),
    };
    let epoch = if epoch.is_empty() { "0" } else { epoch };
    match rest.rfind('-') {
        Some(idx) => (epoch, &rest[..idx], Some(&rest[idx + 1..])),
        None => (epoch, rest, None),
    }
}

/// An upstream version token ordered by [`vercmp`].
///
/// Equality follows the ordering, so `"1.01"` equals `"1.1"`.
#[derive(Debug, Clone)]
pub struct Version(String);

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        vercmp(&self.0, &other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite `epoch:version-release` value.
///
/// Epoch dominates version, which dominates release. An absent release
/// orders as `0` but is remembered so the value prints as it was written.
#[derive(Debug, Clone)]
pub struct CompleteVersion {
    pub epoch: u64,
    pub version: Version,
    pub release: Option<u32>,
}

impl CompleteVersion {
    /// Parse `[epoch:]version[-release]`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SynsyuError::format(raw, "empty version"));
        }

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                let value = epoch
                    .parse::<u64>()
                    .map_err(|_| SynsyuError::format(epoch, "epoch must be an unsigned integer"))?;
                (value, rest)
            }
            None => (0, raw),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) => {
                let value = release.parse::<u32>().map_err(|_| {
                    SynsyuError::format(release, "release must be an unsigned integer")
                })?;
                (version, Some(value))
            }
            None => (rest, None),
        };

        match version.chars().next() {
            Some(c) if c.is_ascii_alphanumeric() => {}
            _ => {
                return Err(SynsyuError::format(
                    version,
                    "version must start with a letter or digit",
                ))
            }
        }
        if let Some(bad) = version
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ':' | '-' | '/'))
        {
            return Err(SynsyuError::format(
                version,
                format!("invalid character `{bad}` in version"),
            ));
        }

        Ok(Self {
            epoch,
            version: Version::new(version),
            release,
        })
    }
}

impl FromStr for CompleteVersion {
    type Err = SynsyuError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for CompleteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CompleteVersion {}

impl PartialOrd for CompleteVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompleteVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.release.unwrap_or(0).cmp(&other.release.unwrap_or(0)))
    }
}

impl fmt::Display for CompleteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = self.release {
            write!(f, "-{release}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_strictly_decreasing(list: &[&str]) {
        for window in list.windows(2) {
            assert_eq!(
                vercmp(window[0], window[1]),
                Ordering::Greater,
                "{} should be newer than {}",
                window[0],
                window[1]
            );
        }
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                assert_eq!(vercmp(a, b), Ordering::Greater, "{a} > {b}");
                assert_eq!(vercmp(b, a), Ordering::Less, "{b} < {a}");
            }
        }
    }

    #[test]
    fn test_prerelease_suffixes_order_below_release() {
        assert_strictly_decreasing(&[
            "1.0.1", "1.0.a", "1.0", "1.0rc", "1.0pre", "1.0p", "1.0beta", "1.0b", "1.0a",
        ]);
    }

    #[test]
    fn test_numeric_segments_ignore_leading_zeros() {
        assert_strictly_decreasing(&[
            "20141130",
            "012",
            "11",
            "3.0.0",
            "2.011",
            "2.03",
            "2.0",
            "1.2",
            "1.1.1",
            "1.1",
            "1.0.1",
            "1.0.0.0.0.0",
            "1.0",
            "1",
        ]);
        assert_eq!(vercmp("012", "12"), Ordering::Equal);
    }

    #[test]
    fn test_vercmp_is_reflexive_and_antisymmetric() {
        let samples = ["1.0", "1.0a", "2:1", "1.0-1", "r1234.abc", "0.9_rc1", "a"];
        for a in samples {
            assert_eq!(vercmp(a, a), Ordering::Equal);
            for b in samples {
                assert_eq!(vercmp(a, b), vercmp(b, a).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_separator_run_length_decides() {
        assert_eq!(vercmp("1..0", "1.0"), Ordering::Greater);
        assert_eq!(vercmp("1.0", "1..0"), Ordering::Less);
        assert_eq!(vercmp("1.0.a", "1.0rc"), Ordering::Greater);
        assert_eq!(vercmp("1.0", "1_0"), Ordering::Equal);
    }

    #[test]
    fn test_numeric_beats_alpha_at_same_position() {
        assert_eq!(vercmp("1.1", "1.a"), Ordering::Greater);
        assert_eq!(vercmp("1.a", "1.1"), Ordering::Less);
    }

    #[test]
    fn test_complete_version_round_trip() {
        let v = CompleteVersion::parse("42:3.14-1").unwrap();
        assert_eq!(v.epoch, 42);
        assert_eq!(v.version.as_str(), "3.14");
        assert_eq!(v.release, Some(1));
        assert_eq!(v.to_string(), "42:3.14-1");

        assert_eq!(CompleteVersion::parse("1.2.3").unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn test_complete_version_component_dominance() {
        let parse = |s: &str| CompleteVersion::parse(s).unwrap();
        assert!(parse("1:0.1-1") > parse("9.9-9"));
        assert!(parse("1.10-1") > parse("1.9-300"));
        assert!(parse("1.0-2") > parse("1.0-1"));
        assert!(parse("1.0-256") > parse("1.0-255"));
        assert_eq!(parse("1.0"), parse("0:1.0-0"));
    }

    #[test]
    fn test_complete_version_rejects_malformed_input() {
        let err = CompleteVersion::parse("x:1.0-1").unwrap_err();
        assert!(matches!(err, SynsyuError::Format { ref input, .. } if input == "x"));

        let err = CompleteVersion::parse("1.0-beta").unwrap_err();
        assert!(matches!(err, SynsyuError::Format { ref input, .. } if input == "beta"));

        let err = CompleteVersion::parse("1:.5-1").unwrap_err();
        assert!(matches!(err, SynsyuError::Format { ref input, .. } if input == ".5"));

        assert!(CompleteVersion::parse("").is_err());
    }

    #[test]
    fn test_compare_evr_ignores_missing_release() {
        assert_eq!(compare_evr("1.0-3", "1.0"), Ordering::Equal);
        assert_eq!(compare_evr("1.0-3", "1.0-2"), Ordering::Greater);
        assert_eq!(compare_evr("1:1.0-1", "2.0-1"), Ordering::Greater);
        assert_eq!(compare_evr("2.3-1.1", "2.3-1"), Ordering::Greater);
        assert_eq!(compare_evr("1.0-1", "1.2-1"), Ordering::Less);
    }
}

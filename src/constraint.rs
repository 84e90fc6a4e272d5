/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::constraint
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Parse `name OP version` dependency strings into bounded
    ranges and intersect constraints on the same package.

  Security / Safety Notes:
    Pure computation; no I/O performed in this module.

  Dependencies:
    crate::version for ordering.

  Operational Scope:
    Consumed by inventory satisfier searches and the resolver.

  Revision History:
    2026-10-16 COD  Introduced constraint algebra.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Intersection never loosens an input bound
    - Contradictory ranges are kept but never satisfied
============================================================*/

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SynsyuError};
use crate::version::compare_evr;

/// One side of a version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: String,
    pub exclusive: bool,
}

impl Bound {
    pub fn inclusive(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            exclusive: false,
        }
    }

    pub fn exclusive(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            exclusive: true,
        }
    }

    // Ranking used when two bounds compare equal: a release-qualified
    // representation is more specific than a bare one.
    fn specificity(&self) -> (bool, usize, &str) {
        (
            has_release(&self.version),
            self.version.len(),
            self.version.as_str(),
        )
    }
}

fn has_release(version: &str) -> bool {
    let upstream = version.split_once(':').map_or(version, |(_, rest)| rest);
    upstream.contains('-')
}

/// A dependency requirement on a package name with optional bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Constraint {
    /// A constraint on a name with no version bounds.
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
        }
    }

    /// Parse `name`, `name=ver`, `name>=ver`, `name<=ver`, `name>ver` or `name<ver`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let Some(op_start) = spec.find(['<', '>', '=']) else {
            if spec.is_empty() {
                return Err(SynsyuError::format(spec, "empty dependency"));
            }
            return Ok(Self::any(spec));
        };

        let name = spec[..op_start].trim_end();
        if name.is_empty() {
            return Err(SynsyuError::format(spec, "dependency has no package name"));
        }

        let rest = &spec[op_start..];
        let (op, version) = ["<=", ">=", "<", ">", "="]
            .iter()
            .find_map(|op| rest.strip_prefix(op).map(|v| (*op, v.trim())))
            .ok_or_else(|| SynsyuError::format(rest, "unknown comparison operator"))?;
        validate_bound_version(version)?;

        let (lower, upper) = match op {
            "=" => (
                Some(Bound::inclusive(version)),
                Some(Bound::inclusive(version)),
            ),
            ">=" => (Some(Bound::inclusive(version)), None),
            ">" => (Some(Bound::exclusive(version)), None),
            "<=" => (None, Some(Bound::inclusive(version))),
            _ => (None, Some(Bound::exclusive(version))),
        };

        Ok(Self {
            name: name.to_string(),
            lower,
            upper,
        })
    }

    /// True when no version bounds are present.
    pub fn is_unversioned(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Intersect two constraints on the same package.
    pub fn restrict(&self, other: &Constraint) -> Result<Constraint> {
        if self.name != other.name {
            return Err(SynsyuError::format(
                other.to_string(),
                format!("cannot intersect with a constraint on `{}`", self.name),
            ));
        }

        Ok(Constraint {
            name: self.name.clone(),
            lower: tighter(self.lower.as_ref(), other.lower.as_ref(), Ordering::Greater),
            upper: tighter(self.upper.as_ref(), other.upper.as_ref(), Ordering::Less),
        })
    }

    /// False when the bounds contradict each other; such a constraint allows nothing.
    pub fn is_satisfiable(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => match compare_evr(&lower.version, &upper.version) {
                Ordering::Less => true,
                Ordering::Equal => !(lower.exclusive || upper.exclusive),
                Ordering::Greater => false,
            },
            _ => true,
        }
    }

    /// Test a concrete `[epoch:]version[-release]` against the bounds.
    pub fn allows(&self, version: &str) -> bool {
        if !self.is_satisfiable() {
            return false;
        }
        let lower_ok = self.lower.as_ref().map_or(true, |bound| {
            match compare_evr(version, &bound.version) {
                Ordering::Greater => true,
                Ordering::Equal => !bound.exclusive,
                Ordering::Less => false,
            }
        });
        let upper_ok = self.upper.as_ref().map_or(true, |bound| {
            match compare_evr(version, &bound.version) {
                Ordering::Less => true,
                Ordering::Equal => !bound.exclusive,
                Ordering::Greater => false,
            }
        });
        lower_ok && upper_ok
    }
}

// Pick the bound that is further towards `direction`; equal bounds merge
// their exclusivity and keep the more specific representation.
fn tighter(a: Option<&Bound>, b: Option<&Bound>, direction: Ordering) -> Option<Bound> {
    match (a, b) {
        (None, None) => None,
        (Some(bound), None) | (None, Some(bound)) => Some(bound.clone()),
        (Some(a), Some(b)) => {
            let verdict = compare_evr(&a.version, &b.version);
            if verdict == direction {
                Some(a.clone())
            } else if verdict == direction.reverse() {
                Some(b.clone())
            } else {
                // A bare exclusive bound excludes every release of its version.
                let bare_exclusive = |bound: &Bound| bound.exclusive && !has_release(&bound.version);
                let kept = match (bare_exclusive(a), bare_exclusive(b)) {
                    (true, false) => a,
                    (false, true) => b,
                    _ if a.specificity() >= b.specificity() => a,
                    _ => b,
                };
                Some(Bound {
                    version: kept.version.clone(),
                    exclusive: a.exclusive || b.exclusive,
                })
            }
        }
    }
}

fn validate_bound_version(version: &str) -> Result<()> {
    if version.is_empty() {
        return Err(SynsyuError::format(version, "missing version after operator"));
    }
    let upstream = match version.split_once(':') {
        Some((epoch, rest)) => {
            if epoch.is_empty() || !epoch.chars().all(|c| c.is_ascii_digit()) {
                return Err(SynsyuError::format(epoch, "epoch must be an unsigned integer"));
            }
            rest
        }
        None => version,
    };
    match upstream.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => {
            return Err(SynsyuError::format(
                upstream,
                "version must start with a letter or digit",
            ))
        }
    }
    if let Some(bad) = version.chars().find(|c| c.is_whitespace()) {
        return Err(SynsyuError::format(
            version,
            format!("invalid character `{bad:?}` in version"),
        ));
    }
    Ok(())
}

/// Strip any comparison operator and version, leaving the package name.
pub fn bare_name(spec: &str) -> &str {
    let spec = spec.trim_start();
    match spec.find(['<', '>', '=']) {
        Some(idx) => spec[..idx].trim_end(),
        None => spec.trim_end(),
    }
}

impl FromStr for Constraint {
    type Err = SynsyuError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper))
                if lower == upper && !lower.exclusive =>
            {
                write!(f, "={}", lower.version)
            }
            (lower, upper) => {
                if let Some(lower) = lower {
                    let op = if lower.exclusive { ">" } else { ">=" };
                    write!(f, "{op}{}", lower.version)?;
                }
                if let Some(upper) = upper {
                    if lower.is_some() {
                        f.write_str(",")?;
                    }
                    let op = if upper.exclusive { "<" } else { "<=" };
                    write!(f, "{op}{}", upper.version)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(spec: &str) -> Constraint {
        Constraint::parse(spec).unwrap()
    }

    #[test]
    fn test_parse_operators() {
        let eq = c("foo=1.0-2");
        assert_eq!(eq.lower, Some(Bound::inclusive("1.0-2")));
        assert_eq!(eq.upper, Some(Bound::inclusive("1.0-2")));

        let gt = c("foo>1.0");
        assert_eq!(gt.lower, Some(Bound::exclusive("1.0")));
        assert!(gt.upper.is_none());

        let le = c("foo <= 2:3.0");
        assert_eq!(le.name, "foo");
        assert_eq!(le.upper, Some(Bound::inclusive("2:3.0")));

        assert!(c("foo").is_unversioned());
    }

    #[test]
    fn test_parse_rejects_malformed_specs() {
        assert!(matches!(
            Constraint::parse(">=1.0"),
            Err(SynsyuError::Format { .. })
        ));
        assert!(matches!(
            Constraint::parse("foo>="),
            Err(SynsyuError::Format { .. })
        ));
        let err = Constraint::parse("foo>=x:1").unwrap_err();
        assert!(matches!(err, SynsyuError::Format { ref input, .. } if input == "x"));
    }

    #[test]
    fn test_restrict_takes_tightest_bounds() {
        let merged = c("foo>=1.0").restrict(&c("foo<2.0")).unwrap();
        assert_eq!(merged.to_string(), "foo>=1.0,<2.0");

        let merged = c("foo>=1.5").restrict(&c("foo>1.0")).unwrap();
        assert_eq!(merged.lower, Some(Bound::inclusive("1.5")));

        let merged = c("foo<=3").restrict(&c("foo<2")).unwrap();
        assert_eq!(merged.upper, Some(Bound::exclusive("2")));
    }

    #[test]
    fn test_restrict_tie_merges_exclusivity_and_specificity() {
        let merged = c("foo>=1.0").restrict(&c("foo>1.0-2")).unwrap();
        assert_eq!(merged.lower, Some(Bound::exclusive("1.0-2")));

        let merged = c("foo<=1.0-1").restrict(&c("foo<=1.0")).unwrap();
        assert_eq!(merged.upper, Some(Bound::inclusive("1.0-1")));

        let merged = c("foo>1.0").restrict(&c("foo>=1.0-3")).unwrap();
        assert_eq!(merged.lower, Some(Bound::exclusive("1.0")));
    }

    #[test]
    fn test_restrict_is_commutative_and_never_looser() {
        let specs = [
            "foo", "foo>=1.0", "foo>1.0", "foo<2", "foo<=2.0-1", "foo=1.5", "foo>=1.0-3",
        ];
        for a in specs {
            for b in specs {
                let ab = c(a).restrict(&c(b)).unwrap();
                let ba = c(b).restrict(&c(a)).unwrap();
                assert_eq!(ab, ba, "{a} ∩ {b}");

                for probe in [
                    "0.5", "1.0", "1.0-1", "1.0-3", "1.0-4", "1.2", "1.5", "2", "2.0-1", "3",
                ] {
                    if ab.allows(probe) {
                        assert!(c(a).allows(probe), "{probe} escapes {a}");
                        assert!(c(b).allows(probe), "{probe} escapes {b}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_restrict_requires_same_name() {
        assert!(c("foo>=1").restrict(&c("bar>=1")).is_err());
    }

    #[test]
    fn test_contradictory_range_allows_nothing() {
        let merged = c("foo>2.0").restrict(&c("foo<1.0")).unwrap();
        assert!(!merged.is_satisfiable());
        assert!(!merged.allows("1.5"));

        let pinched = c("foo>=1.0").restrict(&c("foo<1.0")).unwrap();
        assert!(!pinched.is_satisfiable());
    }

    #[test]
    fn test_allows_respects_exclusivity() {
        assert!(c("foo>=1.1").allows("1.2-1"));
        assert!(!c("foo>=1.1").allows("1.0-1"));
        assert!(!c("foo>1.0").allows("1.0-5"));
        assert!(!c("foo<2.0").allows("1:0.1"));
        assert!(c("foo=1.0").allows("1.0-7"));
    }

    #[test]
    fn test_bare_name_strips_operator() {
        assert_eq!(bare_name("foo>=1.0"), "foo");
        assert_eq!(bare_name("foo "), "foo");
        assert_eq!(bare_name("lib32-bar = 2"), "lib32-bar");
    }
}

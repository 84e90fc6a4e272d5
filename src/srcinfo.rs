/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::srcinfo
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Parse and serialise `.SRCINFO` build-recipe metadata,
    including architecture-suffixed fields and split packages.

  Security / Safety Notes:
    Reads operator-selected files only; the recipe is treated as
    inert text and never evaluated.

  Dependencies:
    None beyond std.

  Operational Scope:
    Consulted before a build to read the fetched recipe and to
    produce canonical text for change detection.

  Revision History:
    2026-10-16 COD  Authored SRCINFO parser and serialiser.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Terminal errors carry line number and offending text
    - Canonical output order for meaningful diffs
    - Explicit empty overrides kept distinct from absence
============================================================*/

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Result, SynsyuError};

/// A list entry that may be restricted to one architecture (`key_arch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchValue {
    pub arch: Option<String>,
    pub value: String,
}

impl ArchValue {
    fn new(arch: Option<&str>, value: &str) -> Self {
        Self {
            arch: arch.map(str::to_string),
            value: value.to_string(),
        }
    }
}

/// Fields that the base section sets as defaults and package sections
/// may override.
///
/// An explicit `key =` line is stored as an empty string (`Some("")` for
/// scalars, an empty entry for lists), which is distinct from a field that
/// was never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFields {
    pub pkgname: String,
    pub pkgdesc: Option<String>,
    pub url: Option<String>,
    pub install: Option<String>,
    pub changelog: Option<String>,
    pub arch: Vec<String>,
    pub groups: Vec<String>,
    pub license: Vec<String>,
    pub depends: Vec<ArchValue>,
    pub optdepends: Vec<ArchValue>,
    pub provides: Vec<ArchValue>,
    pub conflicts: Vec<ArchValue>,
    pub replaces: Vec<ArchValue>,
    pub options: Vec<String>,
    pub backup: Vec<String>,
}

/// A parsed `.SRCINFO` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDescription {
    pub pkgbase: String,
    pub pkgver: String,
    pub pkgrel: String,
    pub epoch: Option<String>,
    pub source: Vec<ArchValue>,
    pub validpgpkeys: Vec<String>,
    pub noextract: Vec<String>,
    pub cksums: Vec<ArchValue>,
    pub md5sums: Vec<ArchValue>,
    pub sha1sums: Vec<ArchValue>,
    pub sha224sums: Vec<ArchValue>,
    pub sha256sums: Vec<ArchValue>,
    pub sha384sums: Vec<ArchValue>,
    pub sha512sums: Vec<ArchValue>,
    pub b2sums: Vec<ArchValue>,
    pub makedepends: Vec<ArchValue>,
    pub checkdepends: Vec<ArchValue>,
    /// Inheritable defaults; `base.arch` is the document's global arch list.
    pub base: PackageFields,
    pub packages: Vec<PackageFields>,
}

impl BuildDescription {
    /// Parse `.SRCINFO` text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fail = |reason: String| SynsyuError::Parse {
                line: idx + 1,
                text: line.to_string(),
                reason,
            };
            let (key, value) = split_pair(line).map_err(fail)?;
            parser.set_header_or_field(key, value).map_err(fail)?;
        }
        parser.finish()
    }

    /// Read and parse a `.SRCINFO` file.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            SynsyuError::Filesystem(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Global architecture list.
    pub fn arch(&self) -> &[String] {
        &self.base.arch
    }

    /// Package names in declaration order.
    pub fn pkgnames(&self) -> Vec<&str> {
        self.packages.iter().map(|pkg| pkg.pkgname.as_str()).collect()
    }

    /// `[epoch:]pkgver-pkgrel`.
    pub fn full_version(&self) -> String {
        match self.epoch.as_deref() {
            Some(epoch) if !epoch.is_empty() && epoch != "0" => {
                format!("{epoch}:{}-{}", self.pkgver, self.pkgrel)
            }
            _ => format!("{}-{}", self.pkgver, self.pkgrel),
        }
    }

    /// Resolve one package's effective fields by applying its overrides
    /// to the base defaults.
    pub fn split_package(&self, name: &str) -> Option<PackageFields> {
        let pkg = self.packages.iter().find(|pkg| pkg.pkgname == name)?;
        let base = &self.base;
        Some(PackageFields {
            pkgname: pkg.pkgname.clone(),
            pkgdesc: merge_scalar(&base.pkgdesc, &pkg.pkgdesc),
            url: merge_scalar(&base.url, &pkg.url),
            install: merge_scalar(&base.install, &pkg.install),
            changelog: merge_scalar(&base.changelog, &pkg.changelog),
            arch: merge_list(&base.arch, &pkg.arch),
            groups: merge_list(&base.groups, &pkg.groups),
            license: merge_list(&base.license, &pkg.license),
            depends: merge_arch_list(&base.depends, &pkg.depends),
            optdepends: merge_arch_list(&base.optdepends, &pkg.optdepends),
            provides: merge_arch_list(&base.provides, &pkg.provides),
            conflicts: merge_arch_list(&base.conflicts, &pkg.conflicts),
            replaces: merge_arch_list(&base.replaces, &pkg.replaces),
            options: merge_list(&base.options, &pkg.options),
            backup: merge_list(&base.backup, &pkg.backup),
        })
    }

    /// Effective fields of every package.
    pub fn split_packages(&self) -> Vec<PackageFields> {
        self.packages
            .iter()
            .filter_map(|pkg| self.split_package(&pkg.pkgname))
            .collect()
    }

    /// Canonical text form: base fields, then one block per package.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let base = &self.base;
        push_header(&mut out, "pkgbase", &self.pkgbase);
        push_scalar(&mut out, "pkgdesc", base.pkgdesc.as_deref());
        push_scalar(&mut out, "pkgver", non_empty(&self.pkgver));
        push_scalar(&mut out, "pkgrel", non_empty(&self.pkgrel));
        push_scalar(&mut out, "epoch", self.epoch.as_deref());
        push_scalar(&mut out, "url", base.url.as_deref());
        push_scalar(&mut out, "install", base.install.as_deref());
        push_scalar(&mut out, "changelog", base.changelog.as_deref());
        push_list(&mut out, "arch", &base.arch);
        push_list(&mut out, "groups", &base.groups);
        push_list(&mut out, "license", &base.license);
        push_arch_list(&mut out, "checkdepends", &self.checkdepends);
        push_arch_list(&mut out, "makedepends", &self.makedepends);
        push_arch_list(&mut out, "depends", &base.depends);
        push_arch_list(&mut out, "optdepends", &base.optdepends);
        push_arch_list(&mut out, "provides", &base.provides);
        push_arch_list(&mut out, "conflicts", &base.conflicts);
        push_arch_list(&mut out, "replaces", &base.replaces);
        push_list(&mut out, "noextract", &self.noextract);
        push_list(&mut out, "options", &base.options);
        push_list(&mut out, "backup", &base.backup);
        push_list(&mut out, "validpgpkeys", &self.validpgpkeys);
        push_arch_list(&mut out, "source", &self.source);
        push_arch_list(&mut out, "cksums", &self.cksums);
        push_arch_list(&mut out, "md5sums", &self.md5sums);
        push_arch_list(&mut out, "sha1sums", &self.sha1sums);
        push_arch_list(&mut out, "sha224sums", &self.sha224sums);
        push_arch_list(&mut out, "sha256sums", &self.sha256sums);
        push_arch_list(&mut out, "sha384sums", &self.sha384sums);
        push_arch_list(&mut out, "sha512sums", &self.sha512sums);
        push_arch_list(&mut out, "b2sums", &self.b2sums);

        for pkg in &self.packages {
            out.push('\n');
            push_header(&mut out, "pkgname", &pkg.pkgname);
            push_scalar(&mut out, "pkgdesc", pkg.pkgdesc.as_deref());
            push_scalar(&mut out, "url", pkg.url.as_deref());
            push_scalar(&mut out, "install", pkg.install.as_deref());
            push_scalar(&mut out, "changelog", pkg.changelog.as_deref());
            push_list(&mut out, "arch", &pkg.arch);
            push_list(&mut out, "groups", &pkg.groups);
            push_list(&mut out, "license", &pkg.license);
            push_arch_list(&mut out, "depends", &pkg.depends);
            push_arch_list(&mut out, "optdepends", &pkg.optdepends);
            push_arch_list(&mut out, "provides", &pkg.provides);
            push_arch_list(&mut out, "conflicts", &pkg.conflicts);
            push_arch_list(&mut out, "replaces", &pkg.replaces);
            push_list(&mut out, "options", &pkg.options);
            push_list(&mut out, "backup", &pkg.backup);
        }
        out
    }
}

fn split_pair(line: &str) -> std::result::Result<(&str, &str), String> {
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| "line does not contain =".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("key is empty".into());
    }
    Ok((key, value.trim()))
}

fn split_arch(key: &str) -> (&str, Option<&str>) {
    match key.split_once('_') {
        Some((key, arch)) => (key, Some(arch)),
        None => (key, None),
    }
}

#[derive(Default)]
struct Parser {
    desc: BuildDescription,
    seen_pkgnames: HashSet<String>,
}

impl Parser {
    fn set_header_or_field(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "pkgbase" => {
                if !self.desc.pkgbase.is_empty() {
                    return Err("key \"pkgbase\" can not occur more than once".into());
                }
                if value.is_empty() {
                    return Err("pkgbase can not be empty".into());
                }
                self.desc.pkgbase = value.to_string();
                Ok(())
            }
            "pkgname" => {
                if self.desc.pkgbase.is_empty() {
                    return Err("key \"pkgname\" can not occur before pkgbase".into());
                }
                if value.is_empty() {
                    return Err("pkgname can not be empty".into());
                }
                if !self.seen_pkgnames.insert(value.to_string()) {
                    return Err(format!("pkgname \"{value}\" can not occur more than once"));
                }
                self.desc.packages.push(PackageFields {
                    pkgname: value.to_string(),
                    ..PackageFields::default()
                });
                Ok(())
            }
            _ if self.desc.pkgbase.is_empty() => Err(format!(
                "key \"{key}\" can not occur before pkgbase or pkgname"
            )),
            _ => self.set_field(key, value),
        }
    }

    fn set_field(&mut self, full_key: &str, value: &str) -> std::result::Result<(), String> {
        let (key, arch) = split_arch(full_key);
        if let Some(arch) = arch {
            if !self.desc.base.arch.iter().any(|declared| declared == arch) {
                return Err(format!("invalid arch \"{arch}\" in key \"{full_key}\""));
            }
        }
        let in_package = !self.desc.packages.is_empty();
        let after_pkgname = || format!("key \"{full_key}\" can not occur after pkgname");

        // Base-only keys without an architecture suffix.
        match full_key {
            "pkgver" | "pkgrel" | "epoch" | "validpgpkeys" | "noextract" => {
                if in_package {
                    return Err(after_pkgname());
                }
                let desc = &mut self.desc;
                match full_key {
                    "pkgver" => desc.pkgver = value.to_string(),
                    "pkgrel" => desc.pkgrel = value.to_string(),
                    "epoch" => desc.epoch = Some(value.to_string()),
                    "validpgpkeys" => desc.validpgpkeys.push(value.to_string()),
                    _ => desc.noextract.push(value.to_string()),
                }
                return Ok(());
            }
            _ => {}
        }

        // Base-only, architecture-dependent lists.
        let desc = &mut self.desc;
        let base_arch_list = match key {
            "source" => Some(&mut desc.source),
            "cksums" => Some(&mut desc.cksums),
            "md5sums" => Some(&mut desc.md5sums),
            "sha1sums" => Some(&mut desc.sha1sums),
            "sha224sums" => Some(&mut desc.sha224sums),
            "sha256sums" => Some(&mut desc.sha256sums),
            "sha384sums" => Some(&mut desc.sha384sums),
            "sha512sums" => Some(&mut desc.sha512sums),
            "b2sums" => Some(&mut desc.b2sums),
            "makedepends" => Some(&mut desc.makedepends),
            "checkdepends" => Some(&mut desc.checkdepends),
            _ => None,
        };
        if let Some(list) = base_arch_list {
            if in_package {
                return Err(after_pkgname());
            }
            list.push(ArchValue::new(arch, value));
            return Ok(());
        }

        // Keys valid in either section.
        let fields = match desc.packages.last_mut() {
            Some(pkg) => pkg,
            None => &mut desc.base,
        };
        let scalar = match full_key {
            "pkgdesc" => Some(&mut fields.pkgdesc),
            "url" => Some(&mut fields.url),
            "install" => Some(&mut fields.install),
            "changelog" => Some(&mut fields.changelog),
            _ => None,
        };
        if let Some(slot) = scalar {
            *slot = Some(value.to_string());
            return Ok(());
        }
        let list = match full_key {
            "arch" => Some(&mut fields.arch),
            "groups" => Some(&mut fields.groups),
            "license" => Some(&mut fields.license),
            "options" => Some(&mut fields.options),
            "backup" => Some(&mut fields.backup),
            _ => None,
        };
        if let Some(list) = list {
            list.push(value.to_string());
            return Ok(());
        }
        let arch_list = match key {
            "depends" => &mut fields.depends,
            "optdepends" => &mut fields.optdepends,
            "provides" => &mut fields.provides,
            "conflicts" => &mut fields.conflicts,
            "replaces" => &mut fields.replaces,
            _ => return Err(format!("unknown key \"{full_key}\"")),
        };
        arch_list.push(ArchValue::new(arch, value));
        Ok(())
    }

    fn finish(self) -> Result<BuildDescription> {
        let desc = self.desc;
        if desc.pkgbase.is_empty() {
            return Err(SynsyuError::MissingField("pkgbase"));
        }
        if desc.packages.is_empty() {
            return Err(SynsyuError::MissingField("pkgname"));
        }
        if desc.pkgver.is_empty() {
            return Err(SynsyuError::MissingField("pkgver"));
        }
        if desc.pkgrel.is_empty() {
            return Err(SynsyuError::MissingField("pkgrel"));
        }
        if desc.base.arch.iter().all(String::is_empty) {
            return Err(SynsyuError::MissingField("arch"));
        }
        Ok(desc)
    }
}

fn merge_scalar(base: &Option<String>, pkg: &Option<String>) -> Option<String> {
    match pkg.as_deref() {
        Some("") => None,
        Some(value) => Some(value.to_string()),
        None => base.clone().filter(|value| !value.is_empty()),
    }
}

fn merge_list(base: &[String], pkg: &[String]) -> Vec<String> {
    let source = if pkg.is_empty() { base } else { pkg };
    source
        .iter()
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}

// A package entry for an architecture replaces every base entry for that
// same architecture.
fn merge_arch_list(base: &[ArchValue], pkg: &[ArchValue]) -> Vec<ArchValue> {
    let overridden: HashSet<Option<&str>> = pkg.iter().map(|v| v.arch.as_deref()).collect();
    let mut merged: Vec<ArchValue> = pkg
        .iter()
        .filter(|v| !v.value.is_empty())
        .cloned()
        .collect();
    merged.extend(
        base.iter()
            .filter(|v| !overridden.contains(&v.arch.as_deref()))
            .filter(|v| !v.value.is_empty())
            .cloned(),
    );
    merged
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn push_header(out: &mut String, key: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "{key} = {value}");
    }
}

fn push_scalar(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = writeln!(out, "\t{key} = {value}");
    }
}

fn push_list(out: &mut String, key: &str, values: &[String]) {
    for value in values {
        let _ = writeln!(out, "\t{key} = {value}");
    }
}

fn push_arch_list(out: &mut String, key: &str, values: &[ArchValue]) {
    for entry in values {
        match entry.arch.as_deref() {
            Some(arch) => {
                let _ = writeln!(out, "\t{key}_{arch} = {}", entry.value);
            }
            None => {
                let _ = writeln!(out, "\t{key} = {}", entry.value);
            }
        }
    }
}

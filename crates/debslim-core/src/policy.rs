//! Curation policy: which packages are eligible and how many get in.
//!
//! Everything that used to be a hard-coded constant set (relevant sections,
//! excluded name prefixes, force-included base packages, budgets) lives in
//! one explicit [`CurationPolicy`] value, loadable from TOML, so the
//! selection rules stay testable with small synthetic sets.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::index::Entry;

/// Errors raised while loading a policy file.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The policy file is not valid TOML.
    #[error("invalid policy file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Selection policy for the curation run.
///
/// The defaults reproduce the stock server-container policy; any field can
/// be overridden from a TOML policy file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurationPolicy {
    /// Archive sections whose packages are candidates for the primary set.
    pub sections: BTreeSet<String>,

    /// Name prefixes excluded from candidacy regardless of section.
    pub excluded_prefixes: Vec<String>,

    /// Packages seeded into the primary set regardless of popularity.
    pub force_include: BTreeSet<String>,

    /// Hard cap on the primary set size.
    pub primary_budget: usize,

    /// Hard cap on the number of additional dependency packages.
    pub dependency_budget: usize,

    /// Minimum install count for popularity-based admission.
    pub score_threshold: u64,
}

impl CurationPolicy {
    /// Load a policy from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Whether an index entry is eligible for primary-set consideration.
    ///
    /// Eligible means: section (last `/` segment, lowercased) is in the
    /// relevant set, and the name does not carry an excluded prefix.
    pub fn is_relevant(&self, entry: &Entry) -> bool {
        if self
            .excluded_prefixes
            .iter()
            .any(|p| entry.name.starts_with(p.as_str()))
        {
            return false;
        }
        let section = entry
            .field("Section")
            .unwrap_or("")
            .to_lowercase()
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        self.sections.contains(&section)
    }
}

impl Default for CurationPolicy {
    fn default() -> Self {
        Self {
            sections: to_set(&[
                "admin",
                "database",
                "devel",
                "editors",
                "golang",
                "httpd",
                "interpreters",
                "java",
                "javascript",
                "libdevel",
                "libs",
                "net",
                "perl",
                "python",
                "ruby",
                "rust",
                "shells",
                "sound",
                "text",
                "utils",
                "vcs",
                "video",
                "web",
            ]),
            excluded_prefixes: [
                "gnome-",
                "kded",
                "kde-",
                "kf5-",
                "kf6-",
                "libkf5",
                "libkf6",
                "kwin-",
                "plasma-",
                "akonadi-",
                "kdenetwork-",
                "kdesdk-",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            force_include: to_set(&[
                // Base system
                "base-files",
                "base-passwd",
                "bash",
                "bsdutils",
                "coreutils",
                "dash",
                "debconf",
                "debian-archive-keyring",
                "debianutils",
                "diffutils",
                "dpkg",
                "e2fsprogs",
                "findutils",
                "gcc-12-base",
                "grep",
                "gzip",
                "hostname",
                "init-system-helpers",
                "libacl1",
                "libattr1",
                "libaudit1",
                "libblkid1",
                "libc-bin",
                "libc6",
                "libcap-ng0",
                "libcap2",
                "libcom-err2",
                "libcrypt1",
                "libdb5.3",
                "libdebconfclient0",
                "libext2fs2",
                "libffi8",
                "libgcc-s1",
                "libgcrypt20",
                "libgmp10",
                "libgnutls30",
                "libgpg-error0",
                "libhogweed6",
                "libidn2-0",
                "liblz4-1",
                "liblzma5",
                "libmount1",
                "libncurses6",
                "libncursesw6",
                "libnettle8",
                "libnsl2",
                "libp11-kit0",
                "libpam-modules",
                "libpam-modules-bin",
                "libpam-runtime",
                "libpam0g",
                "libpcre2-8-0",
                "libpcre3",
                "libseccomp2",
                "libselinux1",
                "libsemanage-common",
                "libsemanage2",
                "libsepol2",
                "libsmartcols1",
                "libss2",
                "libstdc++6",
                "libsystemd0",
                "libtasn1-6",
                "libtinfo6",
                "libudev1",
                "libunistring2",
                "libuuid1",
                "libxxhash0",
                "libzstd1",
                "login",
                "logsave",
                "mawk",
                "mount",
                "ncurses-base",
                "ncurses-bin",
                "passwd",
                "perl-base",
                "sed",
                "sensible-utils",
                "sysvinit-utils",
                "tar",
                "tzdata",
                "util-linux",
                "zlib1g",
                // Essential networking
                "iproute2",
                "iputils-ping",
                "net-tools",
                "dnsutils",
                "netcat-openbsd",
                "curl",
                "wget",
                "ca-certificates",
                "openssl",
                "openssh-client",
                "openssh-server",
                // Essential tools
                "apt",
                "apt-utils",
                "apt-transport-https",
                "unattended-upgrades",
                "apt-listchanges",
                "vim-tiny",
                "nano",
                "less",
                "man-db",
                "procps",
                "psmisc",
                "lsof",
                "strace",
                "htop",
                "iotop",
                "rsync",
                "cron",
                "logrotate",
                "sudo",
                "gnupg",
                "gpg",
                "gpg-agent",
                "systemd",
                "systemd-sysv",
            ]),
            primary_budget: 10_000,
            dependency_budget: 1_000,
            score_threshold: 2_500,
        }
    }
}

fn to_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PackageIndex;

    fn entry_for(text: &str) -> PackageIndex {
        PackageIndex::parse(text.as_bytes(), "Packages").unwrap()
    }

    #[test]
    fn test_relevance_by_section() {
        let policy = CurationPolicy::default();
        let index = entry_for(
            "Package: curl\nSection: net\n\n\
             Package: gimp\nSection: graphics\n\n\
             Package: git\nSection: contrib/vcs\n",
        );
        assert!(policy.is_relevant(index.get("curl").unwrap()));
        assert!(!policy.is_relevant(index.get("gimp").unwrap()));
        // Section compares on the last `/` segment.
        assert!(policy.is_relevant(index.get("git").unwrap()));
    }

    #[test]
    fn test_excluded_prefix_beats_section() {
        let policy = CurationPolicy::default();
        let index = entry_for("Package: gnome-terminal\nSection: utils\n");
        assert!(!policy.is_relevant(index.get("gnome-terminal").unwrap()));
    }

    #[test]
    fn test_missing_section_not_relevant() {
        let policy = CurationPolicy::default();
        let index = entry_for("Package: mystery\nVersion: 1.0\n");
        assert!(!policy.is_relevant(index.get("mystery").unwrap()));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let policy: CurationPolicy = toml::from_str(
            r#"
            sections = ["toys"]
            score_threshold = 5
            "#,
        )
        .unwrap();
        assert_eq!(policy.sections.len(), 1);
        assert_eq!(policy.score_threshold, 5);
        // Untouched fields keep their defaults.
        assert_eq!(policy.primary_budget, 10_000);
        assert!(policy.force_include.contains("bash"));
    }
}

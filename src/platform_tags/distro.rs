use crate::prelude::*;

/// The handful of distro buckets that native binaries actually get built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum TargetDistro {
    Rhel,
    Debian,
    Musl,
    Arm,
    Nixos,
    Freebsd11,
    Freebsd12,
    Freebsd13,
}

static TARGET_DISTRO_NAMES: &[(TargetDistro, &str)] = &[
    (TargetDistro::Rhel, "rhel"),
    (TargetDistro::Debian, "debian"),
    (TargetDistro::Musl, "musl"),
    (TargetDistro::Arm, "arm"),
    (TargetDistro::Nixos, "nixos"),
    (TargetDistro::Freebsd11, "freebsd11"),
    (TargetDistro::Freebsd12, "freebsd12"),
    (TargetDistro::Freebsd13, "freebsd13"),
];

impl TargetDistro {
    pub fn as_str(&self) -> &'static str {
        TARGET_DISTRO_NAMES
            .iter()
            .find(|(distro, _)| distro == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }

    pub fn freebsd(major: u32) -> Option<TargetDistro> {
        match major {
            11 => Some(TargetDistro::Freebsd11),
            12 => Some(TargetDistro::Freebsd12),
            13 => Some(TargetDistro::Freebsd13),
            _ => None,
        }
    }
}

impl TryFrom<&str> for TargetDistro {
    type Error = PlatformError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        TARGET_DISTRO_NAMES
            .iter()
            .find(|(_, name)| *name == value)
            .map(|(distro, _)| *distro)
            .ok_or_else(|| PlatformError::UnknownName {
                kind: "distro",
                name: value.into(),
            })
    }
}

try_from_str_boilerplate!(TargetDistro);

impl Display for TargetDistro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the host calls itself (`original_distro`), which lineage that puts it in
/// (`family_distro`), and which bucket of binaries it can run (`target_distro`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroTriple {
    pub original_distro: Option<String>,
    pub family_distro: Option<String>,
    pub target_distro: Option<TargetDistro>,
}

/// The bits of /etc/os-release we care about, lowercased.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: String,
}

// Keys match in any ASCII case, and files written on Windows end lines with \r\n.
static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^(?i-u:ID)="?([^"\r\n]*)"?\r?$"#).unwrap());
static ID_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^(?i-u:ID_LIKE)="?([^"\r\n]*)"?\r?$"#).unwrap());

fn field(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .unwrap_or_default()
}

impl OsRelease {
    pub fn parse(text: &str) -> OsRelease {
        OsRelease {
            id: field(&ID_RE, text),
            id_like: field(&ID_LIKE_RE, text),
        }
    }

    fn id_is(&self, candidates: &[&str]) -> bool {
        candidates.contains(&self.id.as_str())
    }

    // Substring match, same as the way people usually test ID_LIKE in shell scripts.
    fn like_contains(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|c| self.id_like.contains(c))
    }
}

struct DistroRule {
    matches: fn(&OsRelease) -> bool,
    family: Option<&'static str>,
    target: TargetDistro,
}

// Ordered; the first rule that matches wins. E.g. Manjaro says ID_LIKE=arch, and only
// gets to the arch rule after failing all the debian-ish ones.
static DISTRO_RULES: &[DistroRule] = &[
    DistroRule {
        matches: |os| os.id_is(&["alpine"]),
        // family is the original distro
        family: None,
        target: TargetDistro::Musl,
    },
    DistroRule {
        matches: |os| os.id_is(&["raspbian"]),
        family: Some("debian"),
        target: TargetDistro::Arm,
    },
    DistroRule {
        matches: |os| os.id_is(&["nixos"]),
        family: Some("nixos"),
        target: TargetDistro::Nixos,
    },
    DistroRule {
        matches: |os| os.id_is(&["debian", "ubuntu"]),
        family: Some("debian"),
        target: TargetDistro::Debian,
    },
    DistroRule {
        matches: |os| os.id_is(&["rhel", "centos", "fedora"]),
        family: Some("rhel"),
        target: TargetDistro::Rhel,
    },
    DistroRule {
        matches: |os| os.like_contains(&["debian", "ubuntu"]),
        family: Some("debian"),
        target: TargetDistro::Debian,
    },
    // Arch's libraries are ABI-compatible with the debian builds.
    DistroRule {
        matches: |os| os.id_is(&["arch"]) || os.like_contains(&["arch"]),
        family: Some("arch"),
        target: TargetDistro::Debian,
    },
    DistroRule {
        matches: |os| os.like_contains(&["centos", "fedora", "rhel"]),
        family: Some("rhel"),
        target: TargetDistro::Rhel,
    },
];

pub fn classify(os: &OsRelease) -> DistroTriple {
    let original_distro = Some(os.id.clone()).filter(|id| !id.is_empty());
    let triple = match DISTRO_RULES.iter().find(|rule| (rule.matches)(os)) {
        Some(rule) => DistroTriple {
            family_distro: rule
                .family
                .map(String::from)
                .or_else(|| original_distro.clone()),
            target_distro: Some(rule.target),
            original_distro,
        },
        None => DistroTriple {
            original_distro,
            ..Default::default()
        },
    };
    debug!("classified os-release {:?} as {:?}", os, triple);
    triple
}

/// Classify the distro described by the os-release file at `path`. Can't fail: if
/// the file isn't there (or we're not on Linux at all), we just don't know.
pub async fn resolve_distro(path: &Path) -> DistroTriple {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => classify(&OsRelease::parse(&text)),
        Err(err) => {
            debug!("couldn't read {}: {}", path.display(), err);
            DistroTriple::default()
        }
    }
}

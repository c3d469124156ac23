use super::distro::DistroTriple;
use super::libssl::{LibsslVersion, Strategy};
use crate::prelude::*;

/// Operating system families we know how to pick binaries for. Anything else is kept
/// around by name so the composer can complain about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum OsPlatform {
    Darwin,
    Windows,
    Linux,
    Freebsd,
    Openbsd,
    Netbsd,
    Other(String),
}

impl OsPlatform {
    pub fn current() -> OsPlatform {
        // std spells these the way rustc target triples do; try_from also accepts the
        // names people tend to type (darwin, win32).
        OsPlatform::try_from(std::env::consts::OS)
            .unwrap_or_else(|_| OsPlatform::Other(std::env::consts::OS.into()))
    }

    pub fn is_linux(&self) -> bool {
        *self == OsPlatform::Linux
    }
}

impl TryFrom<&str> for OsPlatform {
    type Error = PlatformError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" => OsPlatform::Darwin,
            "windows" | "win32" => OsPlatform::Windows,
            "linux" => OsPlatform::Linux,
            "freebsd" => OsPlatform::Freebsd,
            "openbsd" => OsPlatform::Openbsd,
            "netbsd" => OsPlatform::Netbsd,
            "" => return Err(PlatformError::UnknownPlatform(value.into())),
            other => OsPlatform::Other(other.into()),
        })
    }
}

try_from_str_boilerplate!(OsPlatform);

impl Display for OsPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OsPlatform::Darwin => "darwin",
            OsPlatform::Windows => "windows",
            OsPlatform::Linux => "linux",
            OsPlatform::Freebsd => "freebsd",
            OsPlatform::Openbsd => "openbsd",
            OsPlatform::Netbsd => "netbsd",
            OsPlatform::Other(name) => name.as_str(),
        })
    }
}

/// CPU architecture, named the way binary release artifacts name them (so "x64", not
/// "x86_64"). `Other` is a CPU this build of Rust knows about and we don't; it still
/// gets a (default) tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Architecture {
    X64,
    Ia32,
    Arm,
    Arm64,
    Ppc,
    Ppc64,
    S390,
    S390x,
    Mips,
    Mipsel,
    Riscv64,
    Loong64,
    Other(&'static str),
}

// (our name, aliases we accept, the machine name `uname -m` usually reports)
static ARCH_NAMES: &[(Architecture, &[&str], &str)] = &[
    (Architecture::X64, &["x64", "x86_64", "amd64"], "x86_64"),
    (Architecture::Ia32, &["ia32", "x86", "i386", "i686"], "i386"),
    (Architecture::Arm, &["arm", "armv7l", "armhf"], "arm"),
    (Architecture::Arm64, &["arm64", "aarch64"], "aarch64"),
    (Architecture::Ppc, &["ppc", "powerpc"], "powerpc"),
    (Architecture::Ppc64, &["ppc64", "powerpc64", "ppc64le"], "powerpc64le"),
    (Architecture::S390, &["s390"], "s390"),
    (Architecture::S390x, &["s390x"], "s390x"),
    (Architecture::Mips, &["mips"], "mips"),
    (Architecture::Mipsel, &["mipsel"], "mipsel"),
    (Architecture::Riscv64, &["riscv64"], "riscv64"),
    (Architecture::Loong64, &["loong64", "loongarch64"], "loongarch64"),
];

impl Architecture {
    pub fn current() -> Architecture {
        Architecture::from_rust_arch(std::env::consts::ARCH)
    }

    fn from_rust_arch(rust_arch: &'static str) -> Architecture {
        let rust_arch = match rust_arch {
            "mips" if cfg!(target_endian = "little") => "mipsel",
            other => other,
        };
        Architecture::try_from(rust_arch).unwrap_or_else(|_| {
            debug!("no binaries are built for CPU {:?}", rust_arch);
            Architecture::Other(rust_arch)
        })
    }

    /// What `uname -m` would probably have said, for when it didn't say anything.
    pub fn machine_name(&self) -> &'static str {
        if let Architecture::Other(name) = *self {
            return name;
        }
        ARCH_NAMES
            .iter()
            .find(|(arch, _, _)| arch == self)
            .map(|(_, _, machine)| *machine)
            .unwrap_or("unknown")
    }
}

impl TryFrom<&str> for Architecture {
    type Error = PlatformError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let wanted = value.trim().to_ascii_lowercase();
        ARCH_NAMES
            .iter()
            .find(|(_, aliases, _)| aliases.contains(&wanted.as_str()))
            .map(|(arch, _, _)| *arch)
            .ok_or_else(|| PlatformError::UnknownArchitecture(value.into()))
    }
}

try_from_str_boilerplate!(Architecture);

impl Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Architecture::Other(name) = self {
            return f.write_str(name);
        }
        // first alias is the canonical name
        let (_, aliases, _) = ARCH_NAMES
            .iter()
            .find(|(arch, _, _)| arch == self)
            .ok_or(std::fmt::Error)?;
        f.write_str(aliases[0])
    }
}

/// The two things we can learn about the host without poking at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSnapshot {
    pub platform: OsPlatform,
    pub arch: Architecture,
}

impl HostSnapshot {
    pub fn current() -> HostSnapshot {
        HostSnapshot::with_overrides(None, None)
    }

    /// The current host, except where the caller says otherwise.
    pub fn with_overrides(
        platform: Option<OsPlatform>,
        arch: Option<Architecture>,
    ) -> HostSnapshot {
        HostSnapshot {
            platform: platform.unwrap_or_else(OsPlatform::current),
            arch: arch.unwrap_or_else(Architecture::current),
        }
    }
}

/// Everything we managed to find out about the host. This is the only thing the
/// composer looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHost {
    pub platform: OsPlatform,
    pub arch: Architecture,
    pub arch_from_uname: Option<String>,
    pub libssl: Option<LibsslVersion>,
    pub libssl_strategy: Option<Strategy>,
    #[serde(flatten)]
    pub distro: DistroTriple,
}

impl ResolvedHost {
    /// A host where we only know the OS and CPU.
    pub fn bare(snapshot: &HostSnapshot) -> ResolvedHost {
        ResolvedHost {
            platform: snapshot.platform.clone(),
            arch: snapshot.arch,
            arch_from_uname: None,
            libssl: None,
            libssl_strategy: None,
            distro: DistroTriple::default(),
        }
    }
}

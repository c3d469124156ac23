use super::distro::TargetDistro;
use super::host::Architecture;
use super::probe::{first_success, Exec};
use crate::prelude::*;

/// The libssl ABIs native binaries get built against. OpenSSL 3 promises ABI
/// stability across its minor releases, so every 3.y is treated as 3.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum LibsslVersion {
    V1_0,
    V1_1,
    V3_0,
}

impl LibsslVersion {
    /// Normalize a (major, minor) pair. Anything we don't ship binaries for is None.
    pub fn from_parts(major: u32, minor: u32) -> Option<LibsslVersion> {
        match (major, minor) {
            (1, 0) => Some(LibsslVersion::V1_0),
            (1, 1) => Some(LibsslVersion::V1_1),
            (3, _) => Some(LibsslVersion::V3_0),
            _ => None,
        }
    }

    pub fn is_1x(&self) -> bool {
        matches!(self, LibsslVersion::V1_0 | LibsslVersion::V1_1)
    }
}

impl TryFrom<&str> for LibsslVersion {
    type Error = PlatformError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "1.0.x" => Ok(LibsslVersion::V1_0),
            "1.1.x" => Ok(LibsslVersion::V1_1),
            "3.0.x" => Ok(LibsslVersion::V3_0),
            _ => Err(PlatformError::UnknownName {
                kind: "libssl version",
                name: value.into(),
            }),
        }
    }
}

try_from_str_boilerplate!(LibsslVersion);

impl Display for LibsslVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LibsslVersion::V1_0 => "1.0.x",
            LibsslVersion::V1_1 => "1.1.x",
            LibsslVersion::V3_0 => "3.0.x",
        })
    }
}

// Single digits on purpose: RHEL 7 calls its OpenSSL 1.0 "libssl.so.10".
static LIBSSL_FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"libssl\.so\.([0-9])(?:\.([0-9]))?").unwrap());

static OPENSSL_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^OpenSSL[ \t]+([0-9]+)\.([0-9]+)\.[0-9]+").unwrap());

/// Pull a version out of a shared library filename, e.g. "libssl.so.1.1".
pub fn parse_libssl_filename(text: &str) -> Option<LibsslVersion> {
    let captures = LIBSSL_FILENAME_RE.captures(text)?;
    let major: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minor: u32 = match captures.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    LibsslVersion::from_parts(major, minor)
}

/// Pull a version out of `openssl version -v`, e.g. "OpenSSL 3.0.2 15 Mar 2022".
pub fn parse_openssl_output(text: &str) -> Option<LibsslVersion> {
    let captures = OPENSSL_VERSION_RE.captures(text)?;
    let major: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minor: u32 = captures.get(2)?.as_str().parse().ok()?;
    LibsslVersion::from_parts(major, minor)
}

/// Which probe gave us the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    SpecificPath,
    LinkerCache,
    OpensslBinary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibsslDetection {
    pub version: Option<LibsslVersion>,
    pub strategy: Option<Strategy>,
    pub arch_from_uname: Option<String>,
}

const EXCLUDE_LIBSSL_0X: &str = r#"grep -v "libssl.so.0""#;

fn list_libssl_in(dir: &str) -> String {
    format!("ls {dir} | grep libssl.so | {EXCLUDE_LIBSSL_0X}")
}

/// Directories where this distro family keeps its libssl.
pub fn specific_paths(target: Option<TargetDistro>, machine: &str) -> Vec<String> {
    match target {
        Some(TargetDistro::Musl) => vec!["/lib".into()],
        Some(TargetDistro::Debian) => vec![
            format!("/usr/lib/{machine}-linux-gnu"),
            format!("/lib/{machine}-linux-gnu"),
        ],
        Some(TargetDistro::Rhel) => vec!["/lib64".into(), "/usr/lib64".into()],
        other => {
            debug!(
                "no known libssl locations for {:?} on {}",
                other.map(|d| d.as_str()),
                machine
            );
            vec![]
        }
    }
}

fn generic_commands() -> Vec<String> {
    vec![
        format!(
            r#"ldconfig -p | sed "s/.*=>s*//" | sed "s|.*/||" | grep libssl | sort | {EXCLUDE_LIBSSL_0X}"#
        ),
        format!("ls /lib64 | grep libssl | {EXCLUDE_LIBSSL_0X}"),
        format!("ls /usr/lib64 | grep libssl | {EXCLUDE_LIBSSL_0X}"),
    ]
}

/// Figure out which libssl the host has. We trust the library files on disk over the
/// `openssl` binary, because the two can disagree (e.g. a serverless image shipping a
/// newer CLI than the library the runtime actually links), and when a distro ships
/// several, the oldest compatible one wins.
///
/// Only fails on musl + anything but x64, where there's nothing we could run anyway.
pub async fn resolve_libssl<E: Exec + ?Sized>(
    exec: &E,
    arch: Architecture,
    target: Option<TargetDistro>,
) -> Result<LibsslDetection> {
    if target == Some(TargetDistro::Musl) && arch != Architecture::X64 {
        return Err(PlatformError::UnsupportedMuslArchitecture { arch }.into());
    }

    let arch_from_uname = first_success(exec, &["uname -m"])
        .await
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());
    let machine = arch_from_uname
        .as_deref()
        .unwrap_or_else(|| arch.machine_name());
    let found = |version, strategy| LibsslDetection {
        version: Some(version),
        strategy: Some(strategy),
        arch_from_uname: arch_from_uname.clone(),
    };

    let specific: Vec<String> = specific_paths(target, machine)
        .iter()
        .map(|dir| list_libssl_in(dir))
        .collect();
    if let Some(listing) = first_success(exec, &specific).await {
        if let Some(version) = parse_libssl_filename(&listing) {
            debug!("found libssl {} in a distro-specific path", version);
            return Ok(found(version, Strategy::SpecificPath));
        }
    }

    if let Some(listing) = first_success(exec, &generic_commands()).await {
        if let Some(version) = parse_libssl_filename(&listing) {
            debug!("found libssl {} via the linker cache", version);
            return Ok(found(version, Strategy::LinkerCache));
        }
    }

    if let Some(output) = first_success(exec, &["openssl version -v"]).await {
        if let Some(version) = parse_openssl_output(&output) {
            debug!("found libssl {} by asking the openssl binary", version);
            return Ok(found(version, Strategy::OpensslBinary));
        }
    }

    debug!("couldn't detect a libssl version");
    Ok(LibsslDetection {
        arch_from_uname,
        ..Default::default()
    })
}

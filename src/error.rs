use crate::platform_tags::Architecture;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Native binaries for musl (Alpine) only exist for x86-64, so there's nothing we
    /// could hand back that would actually load.
    #[error("Alpine Linux (musl) is only supported on the x64 (x86_64) architecture, not {arch}")]
    UnsupportedMuslArchitecture { arch: Architecture },
    #[error("unrecognized operating system name: {0:?}")]
    UnknownPlatform(String),
    #[error("unrecognized CPU architecture name: {0:?}")]
    UnknownArchitecture(String),
    #[error("unrecognized {kind} name: {name:?}")]
    UnknownName { kind: &'static str, name: String },
}

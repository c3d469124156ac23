//! Utilities to introspect the system we're running on, and figure out which build of
//! the native binaries it can load. Those binaries are linked against one particular
//! libssl ABI and one particular C library (glibc or musl), so "which Linux" matters
//! about as much as "which CPU".
//!
//! The pipeline is:
//!
//! - snapshot the OS and CPU (free, from the environment)
//! - on FreeBSD, ask `freebsd-version`; on other non-Linux systems, stop
//! - on Linux, classify /etc/os-release into a distro triple, then go hunting for
//!   libssl -- first in the directories that distro family uses, then in the linker
//!   cache, then by asking the `openssl` binary
//! - feed everything into the composer's decision table
//!
//! Almost nothing in here can fail: a missing signal just means guessing, with a
//! warning. The one exception is musl on anything but x86-64, where there's nothing
//! we could possibly hand back.
mod catalog;
mod compose;
mod distro;
mod freebsd;
mod host;
mod libssl;
mod probe;

pub use catalog::{known_platform_tags, PlatformTag, KNOWN_PLATFORM_TAGS};
pub use compose::{compose_platform_tag, DEFAULT_DISTRO, DEFAULT_LIBSSL};
pub use distro::{classify, resolve_distro, DistroTriple, OsRelease, TargetDistro};
pub use freebsd::resolve_freebsd;
pub use host::{Architecture, HostSnapshot, OsPlatform, ResolvedHost};
pub use libssl::{
    parse_libssl_filename, parse_openssl_output, resolve_libssl, LibsslDetection,
    LibsslVersion, Strategy,
};
pub use probe::{first_success, Exec, Shell};

use crate::prelude::*;

/// Gather every signal about the host that the composer might want.
pub async fn resolve_host<E: Exec + ?Sized>(
    snapshot: &HostSnapshot,
    os_release: &Path,
    exec: &E,
) -> Result<ResolvedHost> {
    let mut resolved = ResolvedHost::bare(snapshot);
    match snapshot.platform {
        OsPlatform::Freebsd => {
            resolved.distro = resolve_freebsd(exec).await;
        }
        OsPlatform::Linux => {
            resolved.distro = resolve_distro(os_release).await;
            let detection =
                resolve_libssl(exec, snapshot.arch, resolved.distro.target_distro)
                    .await?;
            resolved.libssl = detection.version;
            resolved.libssl_strategy = detection.strategy;
            resolved.arch_from_uname = detection.arch_from_uname;
        }
        _ => (),
    }
    debug!("resolved host: {:?}", resolved);
    Ok(resolved)
}

/// The whole thing: look at the host, and say which binaries it should use.
pub async fn platform_tag<E: Exec + ?Sized>(
    snapshot: &HostSnapshot,
    os_release: &Path,
    exec: &E,
    notify: &dyn Notify,
) -> Result<PlatformTag> {
    let resolved = resolve_host(snapshot, os_release, exec).await?;
    let tag = compose_platform_tag(&resolved, notify);
    tag.check_published(notify);
    Ok(tag)
}

#[cfg(test)]
mod test {
    use super::probe::FakeExec;
    use super::*;
    use crate::notify::Recorder;
    use std::io::Write;

    fn os_release(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn snapshot(platform: OsPlatform, arch: Architecture) -> HostSnapshot {
        HostSnapshot { platform, arch }
    }

    #[tokio::test]
    async fn test_ubuntu_arm64() {
        let release = os_release("ID=ubuntu\nID_LIKE=debian\n");
        let fake = FakeExec::default()
            .with("uname -m", "aarch64\n")
            .with(
                "ls /usr/lib/aarch64-linux-gnu | grep libssl.so | grep -v \"libssl.so.0\"",
                "libssl.so.1.1\n",
            );
        let recorder = Recorder::default();
        let tag = platform_tag(
            &snapshot(OsPlatform::Linux, Architecture::Arm64),
            release.path(),
            &fake,
            &recorder,
        )
        .await
        .unwrap();
        assert_eq!(tag.as_str(), "linux-arm64-openssl-1.1.x");
        assert!(recorder.keys().is_empty());
    }

    #[tokio::test]
    async fn test_raspbian_on_x64_has_no_binaries() {
        let release = os_release("ID=raspbian\nID_LIKE=debian\n");
        let fake = FakeExec::default()
            .with("uname -m", "x86_64\n")
            .with("openssl version -v", "OpenSSL 1.1.1n  15 Mar 2022\n");
        let recorder = Recorder::default();
        let tag = platform_tag(
            &snapshot(OsPlatform::Linux, Architecture::X64),
            release.path(),
            &fake,
            &recorder,
        )
        .await
        .unwrap();
        assert_eq!(tag.as_str(), "arm-openssl-1.1.x");
        assert_eq!(recorder.keys(), vec!["platform-tag-unpublished"]);
    }

    #[tokio::test]
    async fn test_alpine_x64() {
        let release = os_release("NAME=\"Alpine Linux\"\nID=alpine\n");
        let fake = FakeExec::default().with(
            "ls /lib | grep libssl.so | grep -v \"libssl.so.0\"",
            "libssl.so.3\n",
        );
        let resolved = resolve_host(
            &snapshot(OsPlatform::Linux, Architecture::X64),
            release.path(),
            &fake,
        )
        .await
        .unwrap();
        assert_eq!(resolved.libssl, Some(LibsslVersion::V3_0));
        assert_eq!(resolved.distro.family_distro.as_deref(), Some("alpine"));
        assert_eq!(
            compose_platform_tag(&resolved, &Recorder::default()).as_str(),
            "linux-musl-openssl-3.0.x"
        );
    }

    #[tokio::test]
    async fn test_alpine_arm64_is_fatal() {
        let release = os_release("ID=alpine\n");
        let err = platform_tag(
            &snapshot(OsPlatform::Linux, Architecture::Arm64),
            release.path(),
            &FakeExec::default(),
            &Recorder::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlatformError>(),
            Some(PlatformError::UnsupportedMuslArchitecture { .. })
        ));
    }

    #[tokio::test]
    async fn test_bare_linux_guesses() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let tag = platform_tag(
            &snapshot(OsPlatform::Linux, Architecture::X64),
            &dir.path().join("missing"),
            &FakeExec::default(),
            &recorder,
        )
        .await
        .unwrap();
        assert_eq!(tag.as_str(), "debian-openssl-1.1.x");
        assert_eq!(recorder.keys(), vec!["distro:undefined", "libssl:undefined"]);
    }

    #[tokio::test]
    async fn test_non_linux_never_probes() {
        let fake = FakeExec::default();
        let tag = platform_tag(
            &snapshot(OsPlatform::Darwin, Architecture::Arm64),
            Path::new("/etc/os-release"),
            &fake,
            &Recorder::default(),
        )
        .await
        .unwrap();
        assert_eq!(tag.as_str(), "darwin-arm64");
        assert!(fake.ran().is_empty());
    }

    #[tokio::test]
    async fn test_freebsd() {
        let fake = FakeExec::default().with("freebsd-version", "13.2-RELEASE-p4\n");
        let resolved = resolve_host(
            &snapshot(OsPlatform::Freebsd, Architecture::X64),
            Path::new("/etc/os-release"),
            &fake,
        )
        .await
        .unwrap();
        assert_eq!(resolved.distro.target_distro, Some(TargetDistro::Freebsd13));
        assert_eq!(
            compose_platform_tag(&resolved, &Recorder::default()).as_str(),
            "freebsd13"
        );
    }

    #[tokio::test]
    async fn test_resolved_host_json() {
        let release = os_release("ID=\"rhel\"\n");
        let fake = FakeExec::default()
            .with("uname -m", "x86_64\n")
            .with("openssl version -v", "OpenSSL 3.0.7 1 Nov 2022\n");
        let resolved = resolve_host(
            &snapshot(OsPlatform::Linux, Architecture::X64),
            release.path(),
            &fake,
        )
        .await
        .unwrap();
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            serde_json::json!({
                "platform": "linux",
                "arch": "x64",
                "arch_from_uname": "x86_64",
                "libssl": "3.0.x",
                "libssl_strategy": "openssl-binary",
                "original_distro": "rhel",
                "family_distro": "rhel",
                "target_distro": "rhel",
            })
        );
    }
}

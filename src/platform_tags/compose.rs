use super::catalog::PlatformTag;
use super::distro::TargetDistro;
use super::host::{Architecture, OsPlatform, ResolvedHost};
use super::libssl::LibsslVersion;
use crate::prelude::*;

pub const DEFAULT_LIBSSL: LibsslVersion = LibsslVersion::V1_1;
pub const DEFAULT_DISTRO: TargetDistro = TargetDistro::Debian;

fn libssl_or_default(host: &ResolvedHost, notify: &dyn Notify) -> LibsslVersion {
    if let Some(libssl) = host.libssl {
        return libssl;
    }
    if host.platform.is_linux() {
        let hint = match host.distro.family_distro.as_deref() {
            Some("debian") => {
                "Please install OpenSSL (`apt-get update -y && apt-get install -y openssl`) \
                 and try again. In a container, add that to your Dockerfile or pick an \
                 image that already ships OpenSSL."
            }
            _ => "Please install OpenSSL and try again.",
        };
        notify.notify_once(
            "libssl:undefined",
            &format!(
                "Couldn't detect which libssl/openssl version to use; defaulting to \
                 \"openssl-{DEFAULT_LIBSSL}\", which may not work.\n{hint}"
            ),
        );
    }
    DEFAULT_LIBSSL
}

fn distro_or_default(host: &ResolvedHost, notify: &dyn Notify) -> TargetDistro {
    if let Some(target) = host.distro.target_distro {
        return target;
    }
    if host.platform.is_linux() {
        notify.notify_once(
            "distro:undefined",
            &format!(
                "Don't know which binaries fit Linux distro \"{}\"; falling back to the \
                 ones built for \"{DEFAULT_DISTRO}\".",
                host.distro.original_distro.as_deref().unwrap_or("unknown")
            ),
        );
    }
    DEFAULT_DISTRO
}

struct TagRule {
    applies: fn(&ResolvedHost) -> bool,
    tag: fn(&ResolvedHost, &dyn Notify) -> String,
    // Only reached because no rule for this specific OS knew what to do.
    fallback: bool,
}

fn distro_openssl(host: &ResolvedHost, notify: &dyn Notify) -> String {
    format!(
        "{}-openssl-{}",
        distro_or_default(host, notify),
        libssl_or_default(host, notify)
    )
}

fn linux_and(host: &ResolvedHost, pred: impl Fn(&ResolvedHost) -> bool) -> bool {
    host.platform.is_linux() && pred(host)
}

// Ordered; first match wins.
static TAG_RULES: &[TagRule] = &[
    TagRule {
        applies: |h| h.platform == OsPlatform::Darwin && h.arch == Architecture::Arm64,
        tag: |_, _| "darwin-arm64".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| h.platform == OsPlatform::Darwin,
        tag: |_, _| "darwin".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| h.platform == OsPlatform::Windows,
        tag: |_, _| "windows".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| h.platform == OsPlatform::Freebsd && h.distro.target_distro.is_some(),
        tag: |h, n| distro_or_default(h, n).to_string(),
        fallback: false,
    },
    TagRule {
        applies: |h| h.platform == OsPlatform::Openbsd,
        tag: |_, _| "openbsd".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| h.platform == OsPlatform::Netbsd,
        tag: |_, _| "netbsd".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| linux_and(h, |h| h.distro.target_distro == Some(TargetDistro::Nixos)),
        tag: |_, _| "linux-nixos".into(),
        fallback: false,
    },
    TagRule {
        applies: |h| linux_and(h, |h| h.arch == Architecture::Arm64),
        tag: |h, n| format!("linux-arm64-openssl-{}", libssl_or_default(h, n)),
        fallback: false,
    },
    TagRule {
        applies: |h| linux_and(h, |h| h.arch == Architecture::Arm),
        tag: |h, n| format!("linux-arm-openssl-{}", libssl_or_default(h, n)),
        fallback: false,
    },
    // The base musl build links OpenSSL 1.x.
    TagRule {
        applies: |h| linux_and(h, |h| h.distro.target_distro == Some(TargetDistro::Musl)),
        tag: |h, _| match h.libssl {
            Some(libssl) if !libssl.is_1x() => format!("linux-musl-openssl-{libssl}"),
            _ => "linux-musl".into(),
        },
        fallback: false,
    },
    TagRule {
        applies: |h| linux_and(h, |h| h.distro.target_distro.is_some() && h.libssl.is_some()),
        tag: distro_openssl,
        fallback: false,
    },
    // From here on we're guessing. Note the asymmetry: knowing only the libssl gets
    // the default distro, knowing only the distro gets the default libssl.
    TagRule {
        applies: |h| h.libssl.is_some(),
        tag: distro_openssl,
        fallback: true,
    },
    TagRule {
        applies: |h| h.distro.target_distro.is_some(),
        tag: distro_openssl,
        fallback: true,
    },
    TagRule {
        applies: |_| true,
        tag: distro_openssl,
        fallback: true,
    },
];

/// Turn everything we know about the host into the tag of the binaries it should use.
/// Never fails: missing signals get defaults, and a note through `notify`.
pub fn compose_platform_tag(host: &ResolvedHost, notify: &dyn Notify) -> PlatformTag {
    context!("picking a platform tag for {} on {}", host.platform, host.arch);

    if host.platform.is_linux() && !matches!(host.arch, Architecture::X64 | Architecture::Arm64)
    {
        notify.notify_once(
            "platform-unsupported-arch",
            &format!(
                "Only x64 (x86_64) and arm64 (aarch64) Linux hosts are officially \
                 supported. If you build the native binaries yourself, you can ignore \
                 this, as long as they're built for \"{}\".",
                host.arch_from_uname
                    .as_deref()
                    .unwrap_or_else(|| host.arch.machine_name())
            ),
        );
    }

    // The last rule always applies, so there's always a rule.
    let rule = TAG_RULES
        .iter()
        .find(|rule| (rule.applies)(host))
        .unwrap_or(&TAG_RULES[TAG_RULES.len() - 1]);
    if rule.fallback && !host.platform.is_linux() {
        let name = host
            .distro
            .original_distro
            .clone()
            .unwrap_or_else(|| host.platform.to_string());
        notify.notify_once(
            "platform-unknown",
            &format!(
                "Detected unknown operating system \"{name}\"; using Linux binaries, \
                 which may not work."
            ),
        );
    }
    let tag = PlatformTag::new((rule.tag)(host, notify));
    debug!("platform tag: {}", tag);
    tag
}

#[cfg(test)]
mod test {
    use super::super::distro::DistroTriple;
    use super::*;
    use crate::notify::Recorder;

    fn host(
        platform: OsPlatform,
        arch: Architecture,
        target: Option<TargetDistro>,
        libssl: Option<LibsslVersion>,
    ) -> ResolvedHost {
        ResolvedHost {
            platform,
            arch,
            arch_from_uname: None,
            libssl,
            libssl_strategy: None,
            distro: DistroTriple {
                original_distro: target.map(|t| t.to_string()),
                family_distro: target.map(|t| t.to_string()),
                target_distro: target,
            },
        }
    }

    fn compose(host: &ResolvedHost) -> (String, Vec<String>) {
        let recorder = Recorder::default();
        let tag = compose_platform_tag(host, &recorder);
        (tag.to_string(), recorder.keys())
    }

    fn linux(
        arch: Architecture,
        target: Option<TargetDistro>,
        libssl: Option<LibsslVersion>,
    ) -> ResolvedHost {
        host(OsPlatform::Linux, arch, target, libssl)
    }

    use Architecture::{Arm64, Ia32, X64};
    use LibsslVersion::{V1_0, V1_1, V3_0};
    use TargetDistro::{Debian, Freebsd13, Musl, Nixos, Rhel};

    #[test]
    fn test_darwin() {
        let darwin = |arch| compose(&host(OsPlatform::Darwin, arch, None, None)).0;
        assert_eq!(darwin(Arm64), "darwin-arm64");
        assert_eq!(darwin(X64), "darwin");
        assert_eq!(darwin(Ia32), "darwin");
    }

    #[test]
    fn test_other_known_oses() {
        assert_eq!(
            compose(&host(OsPlatform::Windows, X64, None, None)),
            ("windows".into(), vec![])
        );
        assert_eq!(compose(&host(OsPlatform::Openbsd, X64, None, None)).0, "openbsd");
        assert_eq!(compose(&host(OsPlatform::Netbsd, X64, None, None)).0, "netbsd");
        assert_eq!(
            compose(&host(OsPlatform::Freebsd, X64, Some(Freebsd13), None)),
            ("freebsd13".into(), vec![])
        );
    }

    #[test]
    fn test_unknown_os_falls_back_to_debian() {
        let (tag, warnings) = compose(&host(OsPlatform::Other("aix".into()), X64, None, None));
        assert_eq!(tag, "debian-openssl-1.1.x");
        assert_eq!(warnings, vec!["platform-unknown"]);

        // a FreeBSD release we have no binaries for is just as unknown
        let mut freebsd = host(OsPlatform::Freebsd, X64, None, None);
        freebsd.distro.original_distro = Some("freebsd14".into());
        let recorder = Recorder::default();
        let tag = compose_platform_tag(&freebsd, &recorder);
        assert_eq!(tag.as_str(), "debian-openssl-1.1.x");
        assert!(recorder
            .message("platform-unknown")
            .unwrap()
            .contains("freebsd14"));
    }

    #[test]
    fn test_linux_arches_beat_distro() {
        assert_eq!(
            compose(&linux(Arm64, Some(Debian), Some(V1_1))),
            ("linux-arm64-openssl-1.1.x".into(), vec![])
        );
        assert_eq!(
            compose(&linux(Arm64, Some(Rhel), None)),
            (
                "linux-arm64-openssl-1.1.x".into(),
                vec!["libssl:undefined".into()]
            )
        );
        let (tag, warnings) = compose(&linux(Architecture::Arm, Some(TargetDistro::Arm), Some(V3_0)));
        assert_eq!(tag, "linux-arm-openssl-3.0.x");
        assert_eq!(warnings, vec!["platform-unsupported-arch"]);
    }

    #[test]
    fn test_unlisted_cpu_gets_defaults() {
        let (tag, warnings) = compose(&linux(Architecture::Other("sparc64"), None, None));
        assert_eq!(tag, "debian-openssl-1.1.x");
        assert_eq!(
            warnings,
            vec![
                "platform-unsupported-arch",
                "distro:undefined",
                "libssl:undefined"
            ]
        );
    }

    #[test]
    fn test_nixos() {
        assert_eq!(
            compose(&linux(X64, Some(Nixos), None)),
            ("linux-nixos".into(), vec![])
        );
        assert_eq!(compose(&linux(Arm64, Some(Nixos), Some(V3_0))).0, "linux-nixos");
    }

    #[test]
    fn test_musl() {
        assert_eq!(
            compose(&linux(X64, Some(Musl), Some(V1_1))),
            ("linux-musl".into(), vec![])
        );
        assert_eq!(compose(&linux(X64, Some(Musl), Some(V1_0))).0, "linux-musl");
        assert_eq!(compose(&linux(X64, Some(Musl), None)).0, "linux-musl");
        assert_eq!(
            compose(&linux(X64, Some(Musl), Some(V3_0))).0,
            "linux-musl-openssl-3.0.x"
        );
    }

    #[test]
    fn test_linux_defaults() {
        assert_eq!(
            compose(&linux(X64, Some(Rhel), Some(V3_0))),
            ("rhel-openssl-3.0.x".into(), vec![])
        );
        assert_eq!(
            compose(&linux(X64, None, Some(V3_0))),
            (
                "debian-openssl-3.0.x".into(),
                vec!["distro:undefined".into()]
            )
        );
        assert_eq!(
            compose(&linux(X64, Some(Rhel), None)),
            (
                "rhel-openssl-1.1.x".into(),
                vec!["libssl:undefined".into()]
            )
        );
        assert_eq!(
            compose(&linux(X64, None, None)),
            (
                "debian-openssl-1.1.x".into(),
                vec!["distro:undefined".into(), "libssl:undefined".into()]
            )
        );
    }

    #[test]
    fn test_libssl_hint_depends_on_family() {
        let recorder = Recorder::default();
        compose_platform_tag(&linux(X64, Some(Debian), None), &recorder);
        assert!(recorder
            .message("libssl:undefined")
            .unwrap()
            .contains("apt-get"));

        let recorder = Recorder::default();
        compose_platform_tag(&linux(X64, Some(Rhel), None), &recorder);
        assert!(!recorder
            .message("libssl:undefined")
            .unwrap()
            .contains("apt-get"));
    }

    #[test]
    fn test_tags_are_in_catalog() {
        let hosts = [
            host(OsPlatform::Darwin, Arm64, None, None),
            host(OsPlatform::Windows, X64, None, None),
            linux(X64, Some(Debian), Some(V1_0)),
            linux(X64, Some(Rhel), Some(V3_0)),
            linux(X64, Some(Musl), Some(V3_0)),
            linux(Arm64, None, None),
            linux(Architecture::Arm, Some(Debian), Some(V1_1)),
        ];
        for h in &hosts {
            let tag = compose_platform_tag(h, &Recorder::default());
            assert!(tag.is_known(), "{} should be in the catalog", tag);
        }
    }
}

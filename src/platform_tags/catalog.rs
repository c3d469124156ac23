use crate::prelude::*;

/// Every platform that native binaries are published for.
pub static KNOWN_PLATFORM_TAGS: &[&str] = &[
    "darwin",
    "darwin-arm64",
    "debian-openssl-1.0.x",
    "debian-openssl-1.1.x",
    "debian-openssl-3.0.x",
    "rhel-openssl-1.0.x",
    "rhel-openssl-1.1.x",
    "rhel-openssl-3.0.x",
    "linux-arm64-openssl-1.0.x",
    "linux-arm64-openssl-1.1.x",
    "linux-arm64-openssl-3.0.x",
    "linux-arm-openssl-1.0.x",
    "linux-arm-openssl-1.1.x",
    "linux-arm-openssl-3.0.x",
    "linux-musl",
    "linux-musl-openssl-3.0.x",
    "linux-nixos",
    "windows",
    "freebsd11",
    "freebsd12",
    "freebsd13",
    "openbsd",
    "netbsd",
    "arm",
];

/// The answer: which build of the native binaries to use on this host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlatformTag(String);

impl PlatformTag {
    pub fn new(tag: impl Into<String>) -> PlatformTag {
        PlatformTag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        KNOWN_PLATFORM_TAGS.contains(&self.as_str())
    }

    /// Like `is_known`, but also tells `notify` when nobody publishes binaries for this
    /// tag. The tag is still the best answer we have, so this never fails.
    pub fn check_published(&self, notify: &dyn Notify) -> bool {
        let known = self.is_known();
        if !known {
            notify.notify_once(
                "platform-tag-unpublished",
                &format!("There are no published binaries for platform \"{self}\"."),
            );
        }
        known
    }
}

/// The whole catalog, in the order `--list` prints it.
pub fn known_platform_tags() -> impl Iterator<Item = PlatformTag> {
    KNOWN_PLATFORM_TAGS.iter().copied().map(PlatformTag::new)
}

impl Display for PlatformTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlatformTag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

use crate::platform_tags::{Architecture, HostSnapshot, OsPlatform};
use crate::prelude::*;

use clap::Args;

/// Where to look, and what to pretend.
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Release metadata file used to tell Linux distributions apart.
    #[arg(
        long,
        env = "PLATFORM_TAG_OS_RELEASE",
        default_value = "/etc/os-release",
        value_name = "PATH"
    )]
    pub os_release: PathBuf,
    /// Pretend to be running on this operating system (darwin, windows, linux, ...).
    #[arg(long, env = "PLATFORM_TAG_PLATFORM", value_name = "OS")]
    pub platform: Option<OsPlatform>,
    /// Pretend to be running on this CPU architecture (x64, arm64, ...).
    #[arg(long, env = "PLATFORM_TAG_ARCH", value_name = "ARCH")]
    pub arch: Option<Architecture>,
}

impl Default for ProbeArgs {
    fn default() -> Self {
        ProbeArgs {
            os_release: "/etc/os-release".into(),
            platform: None,
            arch: None,
        }
    }
}

impl ProbeArgs {
    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot::with_overrides(self.platform.clone(), self.arch)
    }
}

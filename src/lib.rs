pub mod config;
pub mod error;
pub mod notify;
pub mod output;
pub mod platform_tags;
mod prelude;
mod util;

pub use config::ProbeArgs;
pub use error::PlatformError;
pub use notify::{Notify, WarnOnce};
pub use platform_tags::{platform_tag, PlatformTag};

use crate::prelude::*;

/// Figure out which binaries this machine should use, with the default collaborators:
/// real shell commands, and warnings that go to the log once each.
pub async fn current_platform_tag(args: &ProbeArgs) -> Result<PlatformTag> {
    let snapshot = args.snapshot();
    platform_tag(&snapshot, &args.os_release, &platform_tags::Shell, &WarnOnce).await
}

#[cfg(test)]
mod test {
    use super::*;
    use platform_tags::{Architecture, OsPlatform};

    #[tokio::test]
    async fn test_current_platform_tag_with_overrides() {
        let args = ProbeArgs {
            platform: Some(OsPlatform::Windows),
            arch: Some(Architecture::X64),
            ..Default::default()
        };
        let tag = current_platform_tag(&args).await.unwrap();
        assert_eq!(tag.as_str(), "windows");
    }
}

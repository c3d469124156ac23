use super::distro::{DistroTriple, TargetDistro};
use super::probe::{first_success, Exec};
use crate::prelude::*;

static FREEBSD_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+)\.?").unwrap());

/// "13.1-RELEASE-p3" -> 13
pub fn parse_freebsd_version(text: &str) -> Option<u32> {
    FREEBSD_VERSION_RE
        .captures(text.trim())?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Binaries are built per FreeBSD major release, so that's our "distro".
pub async fn resolve_freebsd<E: Exec + ?Sized>(exec: &E) -> DistroTriple {
    let major = first_success(exec, &["freebsd-version"])
        .await
        .as_deref()
        .and_then(parse_freebsd_version);
    let target_distro = major.and_then(TargetDistro::freebsd);
    if target_distro.is_none() {
        debug!("no binaries for FreeBSD release {:?}", major);
    }
    DistroTriple {
        original_distro: major.map(|m| format!("freebsd{m}")),
        family_distro: target_distro.map(|_| "freebsd".into()),
        target_distro,
    }
}

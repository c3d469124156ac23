pub use std::collections::HashSet;
pub use std::convert::{TryFrom, TryInto};
pub use std::fmt::Display;
pub use std::path::{Path, PathBuf};

pub use eyre::{bail, Result, WrapErr};
pub use once_cell::sync::Lazy;
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use serde_with::{DeserializeFromStr, SerializeDisplay};
pub use tracing::{debug, trace, warn};

pub use crate::context;
pub use crate::error::PlatformError;
pub use crate::notify::Notify;
pub use crate::try_from_str_boilerplate;

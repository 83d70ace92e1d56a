use serde::Serialize;

/// Build and identity information of the running application.
///
/// Use the [`app_info!`](crate::app_info) macro so the package name and
/// version are taken from the calling crate, not from this one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Tag or commit hash the binary was built from (`GIT_COMMIT` at build time)
    pub committish: &'static str,
    /// Build date (`BUILD_DATE` at build time)
    pub build_date: &'static str,
}

/// Version payload served by the `__version__` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Version {
    pub committish: String,
    pub build_date: String,
}

impl AppInfo {
    pub fn version(&self) -> Version {
        Version {
            committish: self.committish.to_string(),
            build_date: self.build_date.to_string(),
        }
    }
}

/// Capture [`AppInfo`] for the crate invoking the macro.
///
/// ```ignore
/// use core_config::{app_info, AppInfo};
///
/// let info: AppInfo = app_info!();
/// ```
#[macro_export]
macro_rules! app_info {
    () => {
        $crate::AppInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            committish: match option_env!("GIT_COMMIT") {
                Some(commit) => commit,
                None => "unknown",
            },
            build_date: match option_env!("BUILD_DATE") {
                Some(date) => date,
                None => "unknown",
            },
        }
    };
}

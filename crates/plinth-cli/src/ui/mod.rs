//! Terminal UI utilities: status messages and build progress.

mod messages;
mod progress;

pub use messages::{debug, error, info, success, warning};
pub use progress::StageProgress;

/// Apply the global color preference.
///
/// `owo-colors` respects `NO_COLOR`; the `console` crate gets an explicit
/// switch so spinners and styled output follow the flag too.
pub fn init_colors(no_color: bool) {
    if no_color {
        console::set_colors_enabled(false);
    }
}

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
}

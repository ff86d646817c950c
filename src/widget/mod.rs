//! Presentation controller for the messaging toggle.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server renders the block and injects five positional values (active
//! flag, on/off icon URLs, course id, site base URL). The controller applies
//! the flag to the page's optional elements, flips it on user action and
//! posts the new state to the mutation endpoint.
//!
//! The page is reached only through the [`page::Page`] trait, so the same
//! visual-state routine drives server-side markup and any client page.

pub mod controller;
pub mod markup;
pub mod page;
pub mod transport;

use serde::{Deserialize, Serialize};

use crate::config::Labels;
use crate::routes::PIX_PATH;

/// Emphasis color while messaging is enabled.
pub const ACTIVE_COLOR: &str = "#273a7c";
/// Emphasis color while messaging is disabled.
pub const INACTIVE_COLOR: &str = "#b3b3b3";

/// Constructor arguments injected at render time.
///
/// Serialized positionally as `[active, iconOnUrl, iconOffUrl, courseId, wwwroot]`
/// with `active` as `0`/`1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "InitTuple", from = "InitTuple")]
pub struct InitArgs {
    pub active: bool,
    pub icon_on_url: String,
    pub icon_off_url: String,
    pub course_id: i64,
    pub wwwroot: String,
}

type InitTuple = (u8, String, String, i64, String);

impl From<InitArgs> for InitTuple {
    fn from(args: InitArgs) -> Self {
        (u8::from(args.active), args.icon_on_url, args.icon_off_url, args.course_id, args.wwwroot)
    }
}

impl From<InitTuple> for InitArgs {
    fn from((active, icon_on_url, icon_off_url, course_id, wwwroot): InitTuple) -> Self {
        Self { active: active != 0, icon_on_url, icon_off_url, course_id, wwwroot }
    }
}

impl InitArgs {
    /// Arguments for a course page served from `wwwroot`.
    #[must_use]
    pub fn for_course(wwwroot: &str, course_id: i64, active: bool) -> Self {
        let wwwroot = wwwroot.trim_end_matches('/');
        Self {
            active,
            icon_on_url: format!("{wwwroot}{PIX_PATH}/toggle_on.svg"),
            icon_off_url: format!("{wwwroot}{PIX_PATH}/toggle_off.svg"),
            course_id,
            wwwroot: wwwroot.to_owned(),
        }
    }
}

/// Everything the visual-state routine needs besides the page.
#[derive(Debug, Clone, Copy)]
pub struct Appearance<'a> {
    pub active: bool,
    pub icon_on_url: &'a str,
    pub icon_off_url: &'a str,
    pub labels: &'a Labels,
}

impl<'a> Appearance<'a> {
    #[must_use]
    pub fn new(args: &'a InitArgs, active: bool, labels: &'a Labels) -> Self {
        Self { active, icon_on_url: &args.icon_on_url, icon_off_url: &args.icon_off_url, labels }
    }

    #[must_use]
    pub fn label(&self) -> &'a str {
        if self.active { &self.labels.active } else { &self.labels.inactive }
    }

    #[must_use]
    pub fn color(&self) -> &'static str {
        if self.active { ACTIVE_COLOR } else { INACTIVE_COLOR }
    }

    #[must_use]
    pub fn icon_url(&self) -> &'a str {
        if self.active { self.icon_on_url } else { self.icon_off_url }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

#![forbid(unsafe_code)]

//! Markup for the notice region.

use chartdeck_core::fragment::escape;
use chartdeck_runtime::{Notice, NoticeId};

/// Attribute carrying a notice id; a click on it dismisses the notice.
pub const NOTICE_ID_ATTRIBUTE: &str = "data-notice-id";

/// Render notices oldest first.
#[must_use]
pub fn render<'a>(notices: impl IntoIterator<Item = &'a Notice>) -> String {
    let mut out = String::new();
    for notice in notices {
        out.push_str(&format!(
            "<div class=\"notice notice-{}\" role=\"status\" {}=\"{}\">{}</div>",
            notice.level.as_str(),
            NOTICE_ID_ATTRIBUTE,
            notice.id.0,
            escape(&notice.message),
        ));
    }
    out
}

/// Parse the value of [`NOTICE_ID_ATTRIBUTE`].
#[must_use]
pub fn parse_id(value: &str) -> Option<NoticeId> {
    value.trim().parse().ok().map(NoticeId)
}

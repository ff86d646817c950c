//! Server-side block markup.
//!
//! The toggle button and description are rendered by applying the same
//! visual state the controller applies on the client to an in-memory page,
//! then serializing those elements. The first paint therefore matches what
//! the controller would produce for the injected flag.

use crate::config::Labels;

use super::page::{ElementState, PageModel, Slot, apply_visual_state};
use super::{Appearance, InitArgs};

/// Element id of the clickable toggle button.
pub const TOGGLE_BUTTON_ID: &str = "messaging-toggle";
/// Element id of the `<script type="application/json">` carrying [`InitArgs`].
pub const INIT_SCRIPT_ID: &str = "coursemessaging-init";

const BUTTON_STYLE: &str =
    "cursor:pointer; border:none; background:none; font-size:16px; display:flex; align-items:center; padding:0;";
const ICON_STYLE: &str = "width:45px; height:24px; margin-right:8px; vertical-align:middle;";

/// Toggle button plus description for the given state.
#[must_use]
pub fn render_toggle(args: &InitArgs, labels: &Labels) -> String {
    let mut page = PageModel::with_slots(&[Slot::Icon, Slot::StatusText, Slot::Description]);
    apply_visual_state(&mut page, &Appearance::new(args, args.active, labels));

    let empty = ElementState::default();
    let icon = page.get(Slot::Icon).unwrap_or(&empty);
    let text = page.get(Slot::StatusText).unwrap_or(&empty);
    let description = page.get(Slot::Description).unwrap_or(&empty);

    format!(
        concat!(
            r#"<button id="{button_id}" type="button" style="{button_style}">"#,
            r#"<img id="msg-toggle-icon" src="{src}" alt="{alt}" style="{icon_style}">"#,
            r#"<span id="msg-toggle-text" style="{text_style}">{label}</span>"#,
            "</button>",
            r#"<div id="msg-description" style="margin-top: 8px; font-size: 14px; {description_style}">{description}</div>"#,
        ),
        button_id = TOGGLE_BUTTON_ID,
        button_style = BUTTON_STYLE,
        src = escape_html(icon.attribute("src").unwrap_or_default()),
        alt = escape_html(icon.attribute("alt").unwrap_or_default()),
        icon_style = ICON_STYLE,
        text_style = escape_html(&text.style_text()),
        label = escape_html(text.text.as_deref().unwrap_or_default()),
        description_style = escape_html(&description.style_text()),
        description = escape_html(&labels.description),
    )
}

/// JSON payload the client reads to construct its controller.
#[must_use]
pub fn render_init_script(args: &InitArgs) -> String {
    // serde_json never fails on this shape; fall back to an empty array anyway.
    let json = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_owned());
    format!(
        r#"<script type="application/json" id="{INIT_SCRIPT_ID}">{}</script>"#,
        json.replace('<', "\\u003c")
    )
}

/// Full block body: toggle markup when `visible`, always followed by the init payload.
#[must_use]
pub fn render_block(args: &InitArgs, labels: &Labels, visible: bool) -> String {
    let toggle = if visible { render_toggle(args, labels) } else { String::new() };
    format!(
        r#"<section class="block_coursemessaging" data-region="block-coursemessaging">{toggle}{}</section>"#,
        render_init_script(args)
    )
}

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "markup_test.rs"]
mod tests;

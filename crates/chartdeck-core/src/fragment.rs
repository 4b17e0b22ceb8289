#![forbid(unsafe_code)]

//! Row markup for the entry list container.
//!
//! The server renders the list container after an upload, and the client
//! needs the same markup for two things: the empty-state placeholder it
//! installs after the last row is deleted, and locating rows inside a
//! replacement fragment. Both sides use the structure produced here:
//!
//! ```text
//! <div class="container" id="{title}" data-role="entry">
//! <span>
//! <select name="{title}" data-role="chart-type">…</select>
//! <p class="chart-name" data-role="chart-name">{title}</p>
//! <i class="up arrow" data-role="move-up"></i>
//! <i class="down arrow" data-role="move-down"></i>
//! <i class="delete" data-role="delete"></i>
//! </span>
//! </div>
//! ```
//!
//! The scanner only understands double-quoted attributes on `<div>` tags,
//! which is all the renderer emits.

use crate::entry::{ChartTypeCatalog, Entry};
use crate::role::{EMPTY_STATE_ROLE, ENTRY_ROLE, ROLE_ATTRIBUTE, Role};

/// Placeholder shown when the list holds no entries.
pub const EMPTY_STATE_HTML: &str = concat!(
    "<div class=\"container empty-state\" data-role=\"empty-state\">\n",
    "<span>\n",
    "<p>Nothing loaded. Click below to load</p>\n",
    "</span>\n",
    "</div>"
);

/// Escape text for use in element content or a double-quoted attribute.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Reverse of [`escape`].
#[must_use]
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render one entry row.
///
/// The entry's current type is always offered, even when the catalogue does
/// not list it.
#[must_use]
pub fn render_row(entry: &Entry, catalog: &ChartTypeCatalog) -> String {
    let title = escape(&entry.title);
    let mut options = String::new();
    if !catalog.contains(entry.chart_type.as_str()) {
        push_option(&mut options, entry.chart_type.as_str(), true);
    }
    for ty in catalog.iter() {
        push_option(&mut options, ty.as_str(), *ty == entry.chart_type);
    }

    format!(
        "<div class=\"container\" id=\"{title}\" {attr}=\"{entry_role}\">\n\
         <span>\n\
         <select name=\"{title}\" {attr}=\"{select}\">\n{options}</select>\n\
         <p class=\"chart-name\" {attr}=\"{name}\">{title}</p>\n\
         <i class=\"up arrow\" {attr}=\"{up}\"></i>\n\
         <i class=\"down arrow\" {attr}=\"{down}\"></i>\n\
         <i class=\"delete\" {attr}=\"{delete}\"></i>\n\
         </span>\n\
         </div>",
        attr = ROLE_ATTRIBUTE,
        entry_role = ENTRY_ROLE,
        select = Role::ChartType.data_role(),
        name = Role::ChartName.data_role(),
        up = Role::MoveUp.data_role(),
        down = Role::MoveDown.data_role(),
        delete = Role::Delete.data_role(),
    )
}

fn push_option(out: &mut String, value: &str, selected: bool) {
    let value = escape(value);
    let selected = if selected { " selected" } else { "" };
    out.push_str(&format!("<option value=\"{value}\"{selected}>{value}</option>\n"));
}

/// Value of the option marked `selected` in a row's markup.
#[must_use]
pub fn selected_option(row_markup: &str) -> Option<String> {
    row_markup.split("<option").skip(1).find_map(|option| {
        let tag = &option[..option.find('>')?];
        if tag.ends_with(" selected") {
            attribute(tag, "value").map(unescape)
        } else {
            None
        }
    })
}

/// Move the `selected` mark in a row's markup to the option whose value is
/// `value`. Returns `None` when no option carries that value.
#[must_use]
pub fn with_selected_option(row_markup: &str, value: &str) -> Option<String> {
    let wanted = escape(value);
    let mut out = String::with_capacity(row_markup.len() + " selected".len());
    let mut rest = row_markup;
    let mut found = false;
    while let Some(at) = rest.find("<option") {
        let (head, tail) = rest.split_at(at);
        out.push_str(head);
        let end = tail.find('>')?;
        let tag = tail[..end].trim_end_matches(" selected");
        out.push_str(tag);
        if attribute(tag, "value") == Some(wanted.as_str()) {
            out.push_str(" selected");
            found = true;
        }
        rest = &tail[end..];
    }
    out.push_str(rest);
    found.then_some(out)
}

/// Render the whole list container, or the placeholder when `entries` is empty.
#[must_use]
pub fn render_list(entries: &[Entry], catalog: &ChartTypeCatalog) -> String {
    if entries.is_empty() {
        return EMPTY_STATE_HTML.to_string();
    }
    entries
        .iter()
        .map(|entry| render_row(entry, catalog))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A row located inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRow {
    /// Unescaped row id (the entry title).
    pub id: String,
    /// The row's markup, from its opening tag through its closing `</div>`.
    pub markup: String,
}

/// Result of scanning a list-container fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFragment {
    /// Rows in document order.
    pub rows: Vec<ScannedRow>,
    /// Whether the empty-state placeholder is present.
    pub empty_state: bool,
}

impl ScannedFragment {
    /// Row ids in document order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.id.clone()).collect()
    }
}

/// Locate entry rows and the empty-state placeholder in `html`.
#[must_use]
pub fn scan(html: &str) -> ScannedFragment {
    let mut out = ScannedFragment::default();
    let mut cursor = 0;

    while let Some(offset) = html[cursor..].find("<div") {
        let start = cursor + offset;
        let Some(tag_len) = html[start..].find('>') else {
            break;
        };
        let body_start = start + tag_len + 1;
        let open_tag = &html[start..body_start];

        match attribute(open_tag, ROLE_ATTRIBUTE) {
            Some(role) if role == ENTRY_ROLE => {
                let end = matching_close(html, body_start).unwrap_or(html.len());
                if let Some(id) = attribute(open_tag, "id") {
                    out.rows.push(ScannedRow {
                        id: unescape(id),
                        markup: html[start..end].to_string(),
                    });
                }
                cursor = end;
            }
            Some(role) if role == EMPTY_STATE_ROLE => {
                out.empty_state = true;
                cursor = matching_close(html, body_start).unwrap_or(html.len());
            }
            // Wrappers are descended into.
            _ => cursor = body_start,
        }
    }
    out
}

/// Value of a double-quoted attribute inside an opening tag.
fn attribute<'a>(open_tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {name}=\"");
    let start = open_tag.find(&needle)? + needle.len();
    let len = open_tag[start..].find('"')?;
    Some(&open_tag[start..start + len])
}

/// Byte offset just past the `</div>` closing the element whose body starts at `from`.
fn matching_close(html: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut cursor = from;
    loop {
        let rest = &html[cursor..];
        let open = rest.find("<div");
        let close = rest.find("</div>")?;
        match open {
            Some(o) if o < close => {
                depth += 1;
                cursor += o + "<div".len();
            }
            _ => {
                depth -= 1;
                cursor += close + "</div>".len();
                if depth == 0 {
                    return Some(cursor);
                }
            }
        }
    }
}

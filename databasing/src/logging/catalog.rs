//! Message catalogs
//!
//! A catalog maps small integer ids to format templates. Templates use `{}`
//! placeholders that are filled positionally by [`render`].

use std::fmt::Display;

/// Lookup between message ids and templates, usually derived with
/// `#[derive(MessageCatalog)]`
pub trait MessageCatalog: Copy + Sized + 'static {
    fn id(self) -> u32;

    fn template(self) -> &'static str;

    fn from_id(id: u32) -> Option<Self>;
}

/// Fill the `{}` placeholders of `template` in order.
///
/// Missing details render as `?`; surplus details are appended after `|`.
pub fn render(template: &str, details: &[&dyn Display]) -> String {
    let mut output = String::with_capacity(template.len() + 16 * details.len());
    let mut details = details.iter();
    let mut pieces = template.split("{}").peekable();

    while let Some(piece) = pieces.next() {
        output.push_str(piece);
        if pieces.peek().is_some() {
            match details.next() {
                Some(detail) => output.push_str(&detail.to_string()),
                None => output.push('?'),
            }
        }
    }

    for detail in details {
        output.push_str(" | ");
        output.push_str(&detail.to_string());
    }

    output
}

//! Build [`EmailFields`] and list entries from raw RFC 5322 messages.

use chrono::DateTime;
use mail_parser::MessageParser;

use crate::error::Error;
use crate::pipeline::types::{EmailFields, ListEntry};

/// Format of list-view dates; sorts lexically in time order.
pub const LIST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a raw message into the four fields rules match against.
///
/// The body is the first text part, or the first HTML part with tags
/// removed. Sender and receiver are the first address of `From` and `To`.
pub fn parse_message(raw: &[u8]) -> Result<EmailFields, Error> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::Message("not an RFC 5322 message".into()))?;

    let subject = parsed.subject().unwrap_or_default().to_string();
    let body = match parsed.body_text(0) {
        Some(text) => text.to_string(),
        None => parsed
            .body_html(0)
            .map(|html| html_to_text(html.as_ref()))
            .unwrap_or_default(),
    };
    let sender = first_address(parsed.from());
    let receiver = first_address(parsed.to());

    Ok(EmailFields::new(subject, body, sender, receiver))
}

/// Build the list-view entry for a raw message stored at `url`.
///
/// Dates are normalised to UTC in [`LIST_DATE_FORMAT`]; a message
/// without a parsable `Date` header gets an empty date.
pub fn parse_list_entry(raw: &[u8], url: &str) -> Result<ListEntry, Error> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::Message(format!("{url}: not an RFC 5322 message")))?;

    let sender = parsed
        .from()
        .and_then(|a| a.first())
        .and_then(|a| a.name().or_else(|| a.address()))
        .unwrap_or_default()
        .to_string();
    let date = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .map(|d| d.format(LIST_DATE_FORMAT).to_string())
        .unwrap_or_default();

    Ok(ListEntry {
        subject: parsed.subject().unwrap_or_default().to_string(),
        url: url.to_string(),
        sender,
        date,
        label: String::new(),
    })
}

fn first_address(addr: Option<&mail_parser::Address>) -> String {
    addr.and_then(|a| a.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Remove tags and decode common entities while keeping line structure, so reply headers stay at
/// the start of their own line.
pub fn html_to_text(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "br" | "p" | "div" | "tr" | "li")
                    && !result.is_empty()
                    && !result.ends_with('\n')
                {
                    result.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => result.push(ch),
        }
    }

    decode_entities(&result)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode the common named entities. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

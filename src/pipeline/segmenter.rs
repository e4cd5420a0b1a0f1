//! Current-message extraction from quoted reply threads.
//!
//! Pure string scanning. The visible message ends where the first
//! localized reply header ("From:", "Van:", "De:", ...) begins. When that
//! visible part is only a forwarding stub ("please see below", "FYI"),
//! the quoted message between the first and second header is used.

/// Localized reply-header prefixes, in priority order.
pub const DEFAULT_SENDER_MARKERS: &[&str] = &[
    "From:", "From :", "Van:", "Van :", "De:", "De :", "To:", "To :", "Aan:", "Aan :", "A:",
    "A :",
];

/// Phrases marking the visible text as a stub pointing at the quoted mail.
pub const DEFAULT_CONTINUATION_MARKERS: &[&str] = &[
    "la demande ci-dessous",
    "please see below",
    "zie de onderstaande",
    "zie de onderstaande bericht",
    "FYI",
];

/// Marker lists bound together for repeated use.
#[derive(Debug, Clone)]
pub struct Segmenter {
    sender_markers: Vec<String>,
    continuation_markers: Vec<String>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENDER_MARKERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_CONTINUATION_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl Segmenter {
    pub fn new(sender_markers: Vec<String>, continuation_markers: Vec<String>) -> Self {
        Self {
            sender_markers,
            continuation_markers,
        }
    }

    pub fn sender_markers(&self) -> &[String] {
        &self.sender_markers
    }

    pub fn continuation_markers(&self) -> &[String] {
        &self.continuation_markers
    }

    /// Extract the current message from `body`.
    pub fn extract<'a>(&self, body: &'a str) -> &'a str {
        extract_current_message(body, &self.sender_markers, &self.continuation_markers)
    }
}

/// Isolate the current message of `body`.
///
/// Markers are matched ASCII-case-insensitively, so byte offsets in the
/// lowered text are valid offsets into `body`. Returns `body` unchanged
/// when no sender marker occurs.
pub fn extract_current_message<'a, S: AsRef<str>>(
    body: &'a str,
    sender_markers: &[S],
    continuation_markers: &[S],
) -> &'a str {
    let lowered = body.to_ascii_lowercase();

    for marker in sender_markers {
        let marker = marker.as_ref();
        if marker.is_empty() {
            continue;
        }
        let needle = marker.to_ascii_lowercase();
        let Some(first) = lowered.find(&needle) else {
            continue;
        };

        let current = &body[..first];
        let current_lowered = &lowered[..first];
        let is_stub = continuation_markers.iter().any(|c| {
            let c = c.as_ref();
            !c.is_empty() && current_lowered.contains(&c.to_ascii_lowercase())
        });
        if !is_stub {
            return current;
        }

        // Quoted message: between this marker and its next occurrence.
        let start = first + needle.len();
        return match lowered[start..].find(&needle) {
            Some(second) => &body[start..start + second],
            None => &body[start..],
        };
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(body: &str) -> &str {
        Segmenter::default().extract(body)
    }

    #[test]
    fn cuts_at_first_reply_header() {
        let body = "Hello team, please fix this.\n\nFrom: Alice\nSubject: Old thread";
        let out = extract_current_message(body, &["From:"], &["please see below"]);
        assert_eq!(out, "Hello team, please fix this.\n\n");
    }

    #[test]
    fn stub_uses_text_between_first_and_second_header() {
        let body = "Please see below.\nFrom: Bob\nThe car is damaged.\nFrom: Carol\nOld";
        let out = extract_current_message(body, &["From:"], &["please see below"]);
        assert_eq!(out, " Bob\nThe car is damaged.\n");
    }

    #[test]
    fn stub_without_second_header_takes_the_rest() {
        let body = "FYI\nFrom: Bob\nThe car is damaged.";
        let out = extract_current_message(body, &["From:"], &["FYI"]);
        assert_eq!(out, " Bob\nThe car is damaged.");
    }

    #[test]
    fn no_marker_returns_whole_body() {
        let body = "Just a plain message without any header";
        assert_eq!(
            extract_current_message(body, &["From:", "Van:"], &["FYI"]),
            body
        );
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        let body = "Short note\nFROM: someone\nold text";
        assert_eq!(
            extract_current_message(body, &["From:"], &["FYI"]),
            "Short note\n"
        );
    }

    #[test]
    fn continuation_marker_match_is_case_insensitive() {
        let body = "fyi, please see below\nFrom: Bob\nThe car is damaged.\nFrom: Carol\nOld";
        let out = extract_current_message(body, &["From:"], &["FYI", "Please see below"]);
        assert_eq!(out, " Bob\nThe car is damaged.\n");
    }

    #[test]
    fn markers_checked_in_priority_order() {
        // "Van:" appears first in the text, but "From:" has priority.
        let body = "Hi Van: team\nmore\nFrom: Alice\nquoted";
        assert_eq!(
            extract_current_message(body, &["From:", "Van:"], &[] as &[&str]),
            "Hi Van: team\nmore\n"
        );
    }

    #[test]
    fn empty_body_is_returned_as_is() {
        assert_eq!(defaults(""), "");
    }

    #[test]
    fn output_is_prefix_without_stub() {
        let bodies = [
            "Hello\nVan: Jan\nOude tekst",
            "Bonjour\nDe : Marie\nAncien",
            "No header at all",
            "Thanks\nAan: support@example.com",
        ];
        for body in bodies {
            let out = defaults(body);
            assert!(body.starts_with(out), "{out:?} is not a prefix of {body:?}");
            assert!(out.len() <= body.len());
        }
    }

    #[test]
    fn segmentation_is_a_fixed_point_once_no_marker_remains() {
        let body = "Hello team\n\nFrom: Alice\nSubject: Old thread";
        let once = defaults(body);
        assert_eq!(defaults(once), once);
    }

    #[test]
    fn non_ascii_text_keeps_char_boundaries() {
        let body = "Bonjour, voilà la pièce jointe\nDe: Zoë\nAncien message";
        assert_eq!(defaults(body), "Bonjour, voilà la pièce jointe\n");
    }

    #[test]
    fn segmenter_exposes_marker_lists() {
        let segmenter = Segmenter::new(vec!["From:".into()], vec!["FYI".into()]);
        assert_eq!(segmenter.sender_markers(), ["From:"]);
        assert_eq!(segmenter.continuation_markers(), ["FYI"]);
    }
}

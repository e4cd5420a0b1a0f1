//! Browser automation capability.
//!
//! Implemented by an external driver. Waiting, retries and timeouts live
//! behind this trait; callers only see `UiError` on failure.

use std::fmt;
use std::time::Duration;

use crate::error::UiError;

/// How to locate an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    Id(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::Id(s) => write!(f, "id={s}"),
        }
    }
}

/// What to wait for before interacting with the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    ElementPresent(Selector),
    ElementClickable(Selector),
    AllElementsPresent(Selector),
    TextPresent { selector: Selector, text: String },
}

impl WaitCondition {
    pub fn selector(&self) -> &Selector {
        match self {
            Self::ElementPresent(s)
            | Self::ElementClickable(s)
            | Self::AllElementsPresent(s)
            | Self::TextPresent { selector: s, .. } => s,
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementPresent(s) => write!(f, "presence of {s}"),
            Self::ElementClickable(s) => write!(f, "{s} to be clickable"),
            Self::AllElementsPresent(s) => write!(f, "presence of all {s}"),
            Self::TextPresent { selector, text } => write!(f, "{text:?} in {selector}"),
        }
    }
}

/// Input sent to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Text(String),
    Return,
    Escape,
}

impl KeyInput {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// Synchronous browser driver. One session, one focused window at a time.
pub trait Browser {
    /// Block until `condition` holds or `timeout` elapses.
    fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<(), UiError>;

    /// Visible text of the first matching element.
    fn get_text(&mut self, selector: &Selector) -> Result<String, UiError>;

    /// Visible text of every matching element, in document order.
    fn get_all_texts(&mut self, selector: &Selector) -> Result<Vec<String>, UiError>;

    /// Attribute of every matching element, in document order.
    fn get_all_attributes(
        &mut self,
        selector: &Selector,
        attribute: &str,
    ) -> Result<Vec<String>, UiError>;

    fn send_keys(&mut self, selector: &Selector, input: &KeyInput) -> Result<(), UiError>;

    fn click(&mut self, selector: &Selector) -> Result<(), UiError>;

    /// Whether the element exists right now. Never waits.
    fn is_present(&mut self, selector: &Selector) -> bool;

    /// Open `url` in a new window and focus it.
    fn open_window(&mut self, url: &str) -> Result<(), UiError>;

    /// Close the focused window and focus the one that opened it.
    fn close_window(&mut self) -> Result<(), UiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_display() {
        assert_eq!(Selector::css("div.labels").to_string(), "css=div.labels");
        assert_eq!(Selector::id("s2id_autogen4").to_string(), "id=s2id_autogen4");
    }

    #[test]
    fn wait_condition_exposes_selector() {
        let condition = WaitCondition::TextPresent {
            selector: Selector::css("#drop li"),
            text: "1243".into(),
        };
        assert_eq!(condition.selector(), &Selector::css("#drop li"));
        assert_eq!(condition.to_string(), "\"1243\" in css=#drop li");
    }

    #[test]
    fn wait_condition_display() {
        let s = Selector::css("button.done");
        assert_eq!(
            WaitCondition::ElementClickable(s.clone()).to_string(),
            "css=button.done to be clickable"
        );
        assert_eq!(
            WaitCondition::AllElementsPresent(s).to_string(),
            "presence of all css=button.done"
        );
    }
}

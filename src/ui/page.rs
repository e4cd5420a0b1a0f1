//! Page object for the web mail client.
//!
//! Knows the client's locators and URL scheme; everything else goes
//! through the [`Browser`] capability.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{ApplyError, UiError};
use crate::pipeline::types::{EmailFields, ListEntry};
use crate::ui::browser::{Browser, KeyInput, Selector, WaitCondition};
use crate::ui::{FieldKind, MailUi};

/// Default wait for elements on an open message.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message bodies can take a while to render.
const BODY_TIMEOUT: Duration = Duration::from_secs(20);

static ANGLE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>]+)>").expect("valid address regex"));

/// Address inside `Name <addr>`, or the trimmed text when there is none.
pub fn extract_address(text: &str) -> String {
    match ANGLE_ADDRESS.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Message window URL for a list link (`#mail=<id>` → `/show?msg=<id>`).
pub fn message_url(list_url: &str) -> String {
    list_url.replace("#mail", "/show?msg")
}

/// Forward window URL for a list link.
pub fn forward_url(list_url: &str) -> String {
    list_url.replace("#mail=", "/compose/direction/forward/messageId/")
}

/// Element locators of the mail client.
#[derive(Debug, Clone)]
pub struct Locators {
    // List view
    pub list_subject: Selector,
    pub list_sender: Selector,
    pub list_date: Selector,
    pub list_label: Selector,
    // Message window
    pub subject: Selector,
    pub sender: Selector,
    pub receiver: Selector,
    pub body: Selector,
    pub done_button: Selector,
    // Label field
    pub label_input: Selector,
    pub label_present: Selector,
    pub label_accepted: Selector,
    // Client field
    pub client_input: Selector,
    pub client_present: Selector,
    pub client_dropdown_first: Selector,
    pub client_accepted: Selector,
    // Forward window
    pub forward_input: Selector,
    pub forward_accepted: Selector,
    pub forward_send: Selector,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            list_subject: Selector::css("#messages-list > tbody > tr > td.column-subject > a"),
            list_sender: Selector::css("#messages-list > tbody > tr > td.column-from > span"),
            list_date: Selector::css(
                "#messages-list > tbody > tr > td.column-received-at.sorting_1",
            ),
            list_label: Selector::css("#messages-list > tbody > tr > td.column-3"),
            subject: Selector::css("body > div > form > h2"),
            sender: Selector::css("body > div.main-content > form > div.from"),
            receiver: Selector::css("body > div > form > div.contact > div > span"),
            body: Selector::css("body > div > form > div.content"),
            done_button: Selector::css(
                "body > div > form > div.actions > button.done.call-to-action",
            ),
            label_input: Selector::id("s2id_autogen4"),
            label_present: Selector::css("#s2id_autogen3 > ul > li > div"),
            label_accepted: Selector::css("div.labels li.select2-search-choice"),
            client_input: Selector::css("#s2id_autogen2"),
            client_present: Selector::css("#s2id_autogen1 > ul > li.select2-search-choice > div"),
            client_dropdown_first: Selector::css("#select2-drop > ul > li > ul > li:nth-child(1)"),
            client_accepted: Selector::css("#s2id_autogen1 > ul > li.select2-search-choice"),
            forward_input: Selector::css("#s2id_autogen4"),
            forward_accepted: Selector::css("#s2id_autogen3 > ul > li.select2-search-choice"),
            forward_send: Selector::css(
                "body > div.main-content > form > div.actions > button.send.call-to-action",
            ),
        }
    }
}

/// The mail client driven through a [`Browser`].
pub struct MailPage<B: Browser> {
    browser: B,
    locators: Locators,
    timeout: Duration,
    /// List link of the message currently open.
    open_url: Option<String>,
}

impl<B: Browser> MailPage<B> {
    pub fn new(browser: B) -> Self {
        Self::with_locators(browser, Locators::default())
    }

    pub fn with_locators(browser: B, locators: Locators) -> Self {
        Self {
            browser,
            locators,
            timeout: DEFAULT_TIMEOUT,
            open_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Read the message list. Rows are returned in display order.
    pub fn read_list(&mut self) -> Result<Vec<ListEntry>, UiError> {
        let l = &self.locators;
        self.browser.wait_for(
            &WaitCondition::AllElementsPresent(l.list_subject.clone()),
            BODY_TIMEOUT,
        )?;

        let subjects = self.browser.get_all_texts(&l.list_subject)?;
        let urls = self.browser.get_all_attributes(&l.list_subject, "href")?;
        let senders = self.browser.get_all_texts(&l.list_sender)?;
        let dates = self.browser.get_all_texts(&l.list_date)?;
        let labels = self.browser.get_all_texts(&l.list_label)?;

        let rows = subjects.len();
        if [urls.len(), senders.len(), dates.len(), labels.len()]
            .iter()
            .any(|&n| n != rows)
        {
            warn!(
                subjects = rows,
                urls = urls.len(),
                senders = senders.len(),
                dates = dates.len(),
                labels = labels.len(),
                "List columns differ in length, truncating"
            );
        }

        let entries = subjects
            .into_iter()
            .zip(urls)
            .zip(senders)
            .zip(dates)
            .zip(labels)
            .map(|((((subject, url), sender), date), label)| ListEntry {
                subject,
                url,
                sender,
                date,
                label: label.trim().to_string(),
            })
            .collect::<Vec<_>>();
        debug!(count = entries.len(), "Read message list");
        Ok(entries)
    }

    /// Read the open message. A field that cannot be read is left empty.
    fn read_fields(&mut self) -> EmailFields {
        let l = &self.locators;
        let body = match self
            .browser
            .wait_for(&WaitCondition::ElementPresent(l.body.clone()), BODY_TIMEOUT)
        {
            Ok(()) => text_or_empty(&mut self.browser, &l.body, "body"),
            Err(e) => {
                warn!(error = %e, "Message body did not load");
                String::new()
            }
        };
        let subject = text_or_empty(&mut self.browser, &l.subject, "subject");
        let sender = extract_address(&text_or_empty(&mut self.browser, &l.sender, "sender"));
        let receiver =
            extract_address(&text_or_empty(&mut self.browser, &l.receiver, "receiver"));
        EmailFields {
            subject,
            body,
            sender,
            receiver,
        }
    }
}

fn text_or_empty<B: Browser>(browser: &mut B, selector: &Selector, what: &str) -> String {
    browser.get_text(selector).unwrap_or_else(|e| {
        warn!(field = what, error = %e, "Couldn't read message field");
        String::new()
    })
}

fn close_quietly<B: Browser>(browser: &mut B) {
    if let Err(e) = browser.close_window() {
        debug!(error = %e, "Window already closed");
    }
}

impl<B: Browser> MailUi for MailPage<B> {
    fn open_message(&mut self, entry: &ListEntry) -> Result<EmailFields, UiError> {
        self.browser.open_window(&message_url(&entry.url))?;
        let fields = self.read_fields();
        self.open_url = Some(entry.url.clone());
        Ok(fields)
    }

    fn apply_field(&mut self, field: FieldKind, value: &str) -> Result<(), ApplyError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ApplyError::Empty);
        }

        let l = &self.locators;
        let (input, present, accepted) = match field {
            FieldKind::Label => (&l.label_input, &l.label_present, &l.label_accepted),
            FieldKind::Client => (&l.client_input, &l.client_present, &l.client_accepted),
        };

        if self.browser.is_present(present) {
            return Err(ApplyError::AlreadyPopulated);
        }

        self.browser.send_keys(input, &KeyInput::text(value))?;

        if field == FieldKind::Client {
            // The client code must be the first suggestion offered.
            let offered = WaitCondition::TextPresent {
                selector: l.client_dropdown_first.clone(),
                text: value.to_string(),
            };
            if self.browser.wait_for(&offered, self.timeout).is_err() {
                self.browser.send_keys(input, &KeyInput::Escape)?;
                return Err(ApplyError::NotInDropdown(value.to_string()));
            }
        }

        self.browser.send_keys(input, &KeyInput::Return)?;
        self.browser.send_keys(input, &KeyInput::Escape)?;

        if !self.browser.is_present(accepted) {
            return Err(ApplyError::NotAccepted(value.to_string()));
        }
        info!(%field, value, "Field set");
        Ok(())
    }

    fn forward(&mut self, address: &str) -> Result<(), UiError> {
        let url = self
            .open_url
            .as_deref()
            .map(forward_url)
            .ok_or_else(|| UiError::WindowFailed("no message is open".into()))?;

        self.browser.open_window(&url)?;
        let l = &self.locators;
        let sent = self
            .browser
            .send_keys(&l.forward_input, &KeyInput::text(address))
            .and_then(|()| self.browser.send_keys(&l.forward_input, &KeyInput::Escape));
        if let Err(e) = sent {
            close_quietly(&mut self.browser);
            return Err(e);
        }

        if !self.browser.is_present(&l.forward_accepted) {
            close_quietly(&mut self.browser);
            return Err(UiError::Rejected(format!("recipient {address} not accepted")));
        }

        if let Err(e) = self.browser.click(&l.forward_send) {
            close_quietly(&mut self.browser);
            return Err(e);
        }
        // Sending closes the compose window on the host side.
        info!(address, "Email forwarded");
        Ok(())
    }

    fn close_message(&mut self) -> Result<(), UiError> {
        let done = self.locators.done_button.clone();
        self.browser
            .wait_for(&WaitCondition::ElementClickable(done.clone()), self.timeout)?;
        self.browser.click(&done)?;
        self.open_url = None;
        close_quietly(&mut self.browser);
        info!("Email closed");
        Ok(())
    }

    fn leave_message(&mut self) {
        if self.open_url.take().is_some() {
            close_quietly(&mut self.browser);
        }
    }
}

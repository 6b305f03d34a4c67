// form injector - parse generated text and plan writes into the pull-request form

use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{WizardError, WizardResult};
use crate::page::Page;

/// how long a notice stays on screen
pub const DEFAULT_DISMISS_MS: u64 = 5000;

/// events the shim dispatches after setting a value
pub const SYNTHETIC_EVENTS: [&str; 2] = ["input", "change"];

const TITLE_MARKER: &str = "Title:";
const BODY_MARKER: &str = "description:";

// tried in order, first element found wins
pub const TITLE_FIELD_SELECTORS: &[&str] = &[
    "#pull_request_title",
    "input[name='pull_request[title]']",
    "input[aria-label='Title']",
    "input[name='title']",
    "input#title",
];

pub const BODY_FIELD_SELECTORS: &[&str] = &[
    "#pull_request_body",
    "textarea[name='pull_request[body]']",
    "textarea[aria-label='Comment body']",
    "textarea[name='body']",
    "textarea#description",
];

// placeholder text fallback when none of the selectors match
const TITLE_PLACEHOLDER_NEEDLES: &[&str] = &["title"];
const BODY_PLACEHOLDER_NEEDLES: &[&str] = &["description", "leave a comment", "add a body"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Title,
    Body,
}

impl FieldRole {
    fn selectors(self) -> &'static [&'static str] {
        match self {
            FieldRole::Title => TITLE_FIELD_SELECTORS,
            FieldRole::Body => BODY_FIELD_SELECTORS,
        }
    }

    fn placeholder_scan(self) -> (&'static str, &'static [&'static str]) {
        match self {
            FieldRole::Title => ("input[placeholder]", TITLE_PLACEHOLDER_NEEDLES),
            FieldRole::Body => ("textarea[placeholder]", BODY_PLACEHOLDER_NEEDLES),
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Title => f.write_str("title"),
            FieldRole::Body => f.write_str("description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDescription {
    pub title: String,
    pub body: String,
}

/// split raw generated text into title and body
///
/// a `Title:` line sets the title and a line containing `description:` (any case)
/// switches to body capture, where every later non-empty line is kept. without a
/// title marker the first line is the title and the rest is the body.
pub fn parse_generated(text: &str) -> WizardResult<ParsedDescription> {
    if text.trim().is_empty() {
        return Err(WizardError::Parse("generated text is empty".into()));
    }

    let mut title: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut after_title: Vec<&str> = Vec::new();
    let mut capturing = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if capturing {
            if !trimmed.is_empty() {
                body.push(line.trim_end());
            }
            continue;
        }

        if title.is_none() {
            if let Some(rest) = strip_title_marker(trimmed) {
                title = Some(rest.to_string());
                continue;
            }
        }

        // ascii lowercasing keeps byte offsets valid for slicing `trimmed`
        if let Some(pos) = trimmed.to_ascii_lowercase().find(BODY_MARKER) {
            capturing = true;
            // "Description: text" on one line keeps the text
            let rest = trimmed[pos + BODY_MARKER.len()..].trim();
            if !rest.is_empty() {
                body.push(rest);
            }
            continue;
        }

        if title.is_some() && !trimmed.is_empty() {
            after_title.push(line.trim_end());
        }
    }

    match title {
        Some(title) => {
            // no description marker: whatever followed the title is the body
            let lines = if capturing { body } else { after_title };
            Ok(ParsedDescription {
                title,
                body: lines.join("\n"),
            })
        }
        None => {
            let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
            let title = lines.next().unwrap_or_default().trim().to_string();
            let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
            Ok(ParsedDescription { title, body })
        }
    }
}

fn strip_title_marker(line: &str) -> Option<&str> {
    let line = line.trim_start_matches(|c| c == '#' || c == '*').trim_start();
    line.strip_prefix(TITLE_MARKER)
        .map(|rest| rest.trim().trim_matches('*').trim())
}

/// find the single target field for `role`, returning a selector that resolves to it
pub fn locate_field(page: &Page, role: FieldRole) -> WizardResult<String> {
    for &selector in role.selectors() {
        if let Some(el) = page.select(selector).into_iter().next() {
            return Ok(resolved_selector(el).unwrap_or_else(|| selector.to_string()));
        }
    }

    let (scan, needles) = role.placeholder_scan();
    let by_placeholder = page.select(scan).into_iter().find(|el| {
        el.value()
            .attr("placeholder")
            .map(|p| {
                let p = p.to_lowercase();
                needles.iter().any(|needle| p.contains(needle))
            })
            .unwrap_or(false)
    });
    if let Some(el) = by_placeholder {
        if let Some(selector) = resolved_selector(el) {
            return Ok(selector);
        }
        if let Some(placeholder) = el.value().attr("placeholder") {
            return Ok(format!(
                "{}[placeholder=\"{}\"]",
                el.value().name(),
                placeholder.replace('"', "\\\"")
            ));
        }
    }

    Err(WizardError::FormFieldNotFound(role))
}

/// a selector pinned to the element's id or name, when it has one
fn resolved_selector(el: ElementRef<'_>) -> Option<String> {
    let tag = el.value().name();
    if let Some(id) = el.value().id() {
        if id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Some(format!("#{id}"));
        }
        return Some(format!("{tag}[id=\"{}\"]", id.replace('"', "\\\"")));
    }
    el.value()
        .attr("name")
        .map(|name| format!("{tag}[name=\"{}\"]", name.replace('"', "\\\"")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWrite {
    pub role: FieldRole,
    pub selector: String,
    pub value: String,
    pub events: Vec<String>,
}

impl FieldWrite {
    fn new(role: FieldRole, selector: String, value: String) -> Self {
        Self {
            role,
            selector,
            value,
            events: SYNTHETIC_EVENTS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// what the browser shim should write; a missing field is dropped, not fatal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPlan {
    pub title: Option<FieldWrite>,
    pub body: Option<FieldWrite>,
    pub missing: Vec<FieldRole>,
}

impl InjectionPlan {
    pub fn writes(&self) -> impl Iterator<Item = &FieldWrite> {
        self.title.iter().chain(self.body.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }

    pub fn notice(&self) -> Notice {
        match (&self.title, &self.body) {
            (Some(_), Some(_)) => Notice::success("Title and description inserted"),
            (Some(_), None) => Notice::success("Title inserted (description field not found)"),
            (None, Some(_)) => Notice::success("Description inserted (title field not found)"),
            (None, None) => {
                Notice::warning("Could not find the pull request title or description fields")
            }
        }
    }
}

/// plan writes for already-parsed text
pub fn plan_injection(page: &Page, parsed: &ParsedDescription) -> InjectionPlan {
    let mut plan = InjectionPlan::default();

    for role in [FieldRole::Title, FieldRole::Body] {
        let value = match role {
            FieldRole::Title => parsed.title.clone(),
            FieldRole::Body => parsed.body.clone(),
        };
        match locate_field(page, role) {
            Ok(selector) => {
                let write = FieldWrite::new(role, selector, value);
                match role {
                    FieldRole::Title => plan.title = Some(write),
                    FieldRole::Body => plan.body = Some(write),
                }
            }
            Err(e) => {
                tracing::warn!("{e}");
                plan.missing.push(role);
            }
        }
    }

    plan
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionOutcome {
    pub plan: Option<InjectionPlan>,
    pub notice: Notice,
}

/// parse + locate + plan; only a parse failure loses the whole insertion
pub fn inject(page: &Page, text: &str) -> InjectionOutcome {
    match parse_generated(text) {
        Ok(parsed) => {
            let plan = plan_injection(page, &parsed);
            let notice = plan.notice();
            InjectionOutcome {
                plan: Some(plan),
                notice,
            }
        }
        Err(e) => {
            tracing::warn!("insertion failed: {e}");
            InjectionOutcome {
                plan: None,
                notice: Notice::error("Failed to insert the generated description"),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// transient, auto-dismissing user notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub dismiss_after_ms: u64,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            dismiss_after_ms: DEFAULT_DISMISS_MS,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

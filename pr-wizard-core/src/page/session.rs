// navigation tracking, owned by whoever drives the page (host loop, cli)

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    First,
    Unchanged,
    Changed { from: String, to: String },
}

#[derive(Debug, Default, Clone)]
pub struct PageSession {
    last_location: Option<String>,
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_location(&self) -> Option<&str> {
        self.last_location.as_deref()
    }

    /// compare against the last seen location and remember the new one
    pub fn observe(&mut self, location: &str) -> Navigation {
        let location = location.trim_end_matches('#').to_string();
        match self.last_location.replace(location.clone()) {
            None => Navigation::First,
            Some(previous) if previous == location => Navigation::Unchanged,
            Some(previous) => Navigation::Changed {
                from: previous,
                to: location,
            },
        }
    }
}

/// pull-request creation pages are the only ones worth scraping
pub fn is_compare_page(url: &str) -> bool {
    url.contains("/compare/") || url.contains("/pull/new/")
}

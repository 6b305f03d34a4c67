// ordered strategy chain: the first strategy that yields something wins

use super::Page;

type Strategy<T> = Box<dyn Fn(&Page) -> Option<T> + Send + Sync>;

/// result of a successful cascade run
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt<T> {
    pub strategy: &'static str,
    pub value: T,
}

pub struct Cascade<T> {
    name: &'static str,
    strategies: Vec<(&'static str, Strategy<T>)>,
}

impl<T> Cascade<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            strategies: Vec::new(),
        }
    }

    pub fn then<F>(mut self, label: &'static str, strategy: F) -> Self
    where
        F: Fn(&Page) -> Option<T> + Send + Sync + 'static,
    {
        self.strategies.push((label, Box::new(strategy)));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn run(&self, page: &Page) -> Option<Attempt<T>> {
        for (label, strategy) in &self.strategies {
            let label = *label;
            if let Some(value) = strategy(page) {
                tracing::debug!(cascade = self.name, strategy = label, "strategy succeeded");
                return Some(Attempt {
                    strategy: label,
                    value,
                });
            }
            tracing::trace!(cascade = self.name, strategy = label, "strategy yielded nothing");
        }
        tracing::debug!(cascade = self.name, "every strategy came back empty");
        None
    }
}

/// `Some` only for a non-empty vec, so empty results fall through
pub fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_successful_strategy_wins() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let cascade = Cascade::new("numbers")
            .then("empty", |_| non_empty(Vec::<u32>::new()))
            .then("one", |_| Some(vec![1]))
            .then("never", move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Some(vec![2])
            });

        let page = Page::parse("<p></p>");
        let attempt = cascade.run(&page).unwrap();
        assert_eq!(attempt.strategy, "one");
        assert_eq!(attempt.value, vec![1]);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_empty_yields_none() {
        let cascade: Cascade<Vec<u8>> = Cascade::new("nothing").then("a", |_| None);
        assert_eq!(cascade.len(), 1);
        assert!(cascade.run(&Page::parse("")).is_none());
    }
}

use std::sync::OnceLock;

use scraper::Selector;

/// A CSS selector compiled on first use and shared for the life of the process.
#[derive(Debug)]
pub(super) struct StaticSelector<'a> {
    cell: OnceLock<Selector>,
    selector: &'a str,
}

impl<'a> StaticSelector<'a> {
    pub(super) const fn new(selector: &'a str) -> Self {
        Self {
            cell: OnceLock::new(),
            selector,
        }
    }
}

impl<'a> core::ops::Deref for StaticSelector<'a> {
    type Target = Selector;

    fn deref(&self) -> &Self::Target {
        self.cell
            .get_or_init(|| match Selector::parse(self.selector) {
                Ok(sel) => sel,
                Err(e) => panic!("Error parsing static selector {}: {:?}", self.selector, e),
            })
    }
}

#[macro_export]
macro_rules! static_selector {
    ($x: ident <- $sel: literal) => {
        static $x: $crate::parse::static_selector::StaticSelector =
            $crate::parse::static_selector::StaticSelector::new($sel);
    };
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    #[test]
    fn test_static_selector_matches() {
        static_selector!(CELL_SELECTOR <- "td.cell");
        let html = Html::parse_fragment(r#"<table><tr><td class="cell">a</td><td>b</td></tr></table>"#);
        assert_eq!(html.select(&CELL_SELECTOR).count(), 1);
        // second deref reuses the compiled selector
        assert_eq!(html.select(&CELL_SELECTOR).count(), 1);
    }
}

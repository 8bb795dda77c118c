//! Page-number windowing for pagination controls.

use std::fmt;

/// Pages at or below this count are listed without ellipses.
const MAX_UNCOLLAPSED_PAGES: u32 = 7;

/// One slot in a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A clickable page number.
    Page(u32),
    /// A gap of one or more hidden pages.
    Ellipsis,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

/// Compute the page-number window for `current_page` of `total_pages`.
///
/// Small page counts list every page. Larger ones show the first page, the
/// current page with one neighbour on each side, and the last page, with an
/// ellipsis wherever more than one page is skipped. `current_page` is clamped
/// into `1..=total_pages`.
///
/// ```rust
/// # use storefront_core::pagination::{page_window, PageItem::{Page, Ellipsis}};
/// assert_eq!(
///     page_window(10, 5),
///     vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
/// );
/// ```
#[must_use]
pub fn page_window(total_pages: u32, current_page: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    if total_pages <= MAX_UNCOLLAPSED_PAGES {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let last_inner = total_pages - 1;
    let current = current_page.clamp(1, total_pages);
    let mut start = current.saturating_sub(1).max(2);
    let mut end = current.saturating_add(1).min(last_inner);
    // A single hidden page is shown instead of an ellipsis.
    if start == 3 {
        start = 2;
    }
    if total_pages - end == 2 {
        end = last_inner;
    }

    let mut items = vec![PageItem::Page(1)];
    if start > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < last_inner {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total_pages));
    items
}

#[cfg(test)]
mod tests {
    use super::PageItem::{Ellipsis, Page};
    use super::*;

    #[test]
    fn test_middle_page_collapses_both_sides() {
        assert_eq!(
            page_window(10, 5),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_few_pages_listed_in_full() {
        assert_eq!(page_window(4, 2), vec![Page(1), Page(2), Page(3), Page(4)]);
        assert_eq!(page_window(1, 1), vec![Page(1)]);
    }

    #[test]
    fn test_zero_pages_is_empty() {
        assert!(page_window(0, 1).is_empty());
    }

    #[test]
    fn test_first_page() {
        assert_eq!(page_window(10, 1), vec![Page(1), Page(2), Ellipsis, Page(10)]);
    }

    #[test]
    fn test_last_page() {
        assert_eq!(page_window(10, 10), vec![Page(1), Ellipsis, Page(9), Page(10)]);
    }

    #[test]
    fn test_no_ellipsis_for_adjacent_pages() {
        assert_eq!(
            page_window(10, 3),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_single_hidden_page_is_shown() {
        assert_eq!(
            page_window(10, 4),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_window(10, 7),
            vec![Page(1), Ellipsis, Page(6), Page(7), Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        assert_eq!(page_window(10, 42), page_window(10, 10));
        assert_eq!(page_window(10, 0), page_window(10, 1));
    }

    #[test]
    fn test_display() {
        let rendered: Vec<String> = page_window(10, 5).iter().map(ToString::to_string).collect();
        assert_eq!(rendered.join(" "), "1 ... 4 5 6 ... 10");
    }
}

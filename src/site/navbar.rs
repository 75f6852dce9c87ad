//! Navbar discovery: category links, deduplicated by URL.

use crate::error::Result;
use crate::render::{Element, Session};
use crate::site::models::NavLink;
use crate::site::selectors::{CategorySource, SelectorConfig};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Extracts the site's category links from the current document.
///
/// Links keep discovery order. A URL rendered several times (desktop and
/// mobile menus, say) is kept once.
pub async fn discover(session: &dyn Session, config: &SelectorConfig) -> Result<Vec<NavLink>> {
    let items = session.query(&config.navbar_item).await?;
    debug!("Found {} navbar items", items.len());

    let links = match config.category_source {
        CategorySource::Navbar => group(&items),
        CategorySource::Selector => items.iter().filter_map(plain_link).collect(),
    };

    Ok(dedup(links))
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn plain_link(item: &Element) -> Option<NavLink> {
    let label = lines(item.text()).first().copied().unwrap_or_default().to_string();
    match item.link() {
        Some(url) => Some(NavLink::new(label, url)),
        None => {
            trace!("Navbar item '{}' has no link", label);
            None
        }
    }
}

/// Assigns parent groups to navbar links.
///
/// An item whose text spans several lines opens a group: its first line is
/// the group label and the remaining lines name the children. Following
/// single-line items whose label is one of those children belong to the
/// group; any other item closes it.
fn group(items: &[Element]) -> Vec<NavLink> {
    let mut links = Vec::new();
    let mut open: Option<(String, HashSet<String>)> = None;

    for item in items {
        let text = lines(item.text());
        let Some(label) = text.first().map(|l| l.to_string()) else {
            continue;
        };

        let parent = if text.len() > 1 {
            open = Some((label.clone(), text[1..].iter().map(|l| l.to_string()).collect()));
            None
        } else {
            match &open {
                Some((parent, children)) if children.contains(&label) => Some(parent.clone()),
                _ => {
                    open = None;
                    None
                }
            }
        };

        if let Some(url) = item.link() {
            let link = NavLink::new(label, url);
            links.push(match parent {
                Some(parent) => link.with_parent(parent),
                None => link,
            });
        }
    }

    links
}

fn dedup(links: Vec<NavLink>) -> Vec<NavLink> {
    let mut seen = HashSet::new();
    links.into_iter().filter(|link| seen.insert(link.url.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, url: &str) -> Element {
        Element::new(text).with_link(url)
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let links = dedup(vec![
            NavLink::new("Dogs", "https://shop.test/dogs"),
            NavLink::new("Cats", "https://shop.test/cats"),
            NavLink::new("Dogs (mobile)", "https://shop.test/dogs"),
        ]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "Dogs");
        assert_eq!(links[1].label, "Cats");
    }

    #[test]
    fn test_plain_link_uses_first_line() {
        let link = plain_link(&item("\n  Dogs\n  Food\n", "https://shop.test/dogs")).unwrap();
        assert_eq!(link.label, "Dogs");
        assert_eq!(link.parent, None);
        assert!(plain_link(&Element::new("No link")).is_none());
    }

    #[test]
    fn test_group_children_under_parent() {
        let items = vec![
            item("Dogs\nFood\nToys", "https://shop.test/dogs"),
            item("Food", "https://shop.test/dogs/food"),
            item("Toys", "https://shop.test/dogs/toys"),
            item("Sale", "https://shop.test/sale"),
            item("Food", "https://shop.test/food"),
        ];

        let links = group(&items);
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].parent, None);
        assert_eq!(links[1].parent.as_deref(), Some("Dogs"));
        assert_eq!(links[2].parent.as_deref(), Some("Dogs"));
        // "Sale" is not a child of Dogs, so the group closes.
        assert_eq!(links[3].parent, None);
        assert_eq!(links[4].parent, None);
    }

    #[test]
    fn test_group_skips_blank_items() {
        let items = vec![item("   ", "https://shop.test/x"), item("Cats", "https://shop.test/cats")];
        let links = group(&items);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Cats");
    }
}

//! The page frame for the logged-in screens: header navigation on top, a
//! scrollable main region, and a fixed navigation bar at the bottom.

use maud::{Markup, html};

use crate::{
    db::StorageMode,
    html::{HeadElement, base},
    navigation::NavBar,
};

/// Render `content` inside the app frame.
///
/// `active_endpoint` highlights the matching navigation link. A banner warns
/// the user when `storage_mode` will lose records on restart.
pub fn layout(
    title: &str,
    active_endpoint: &str,
    storage_mode: &StorageMode,
    head_elements: &[HeadElement],
    content: &Markup,
) -> Markup {
    let nav_bar = NavBar::new(active_endpoint);

    let frame = html! {
        div id="app-frame" class="flex flex-col h-screen"
        {
            (nav_bar.header_html())

            @if storage_mode.is_volatile()
            {
                (storage_banner(storage_mode))
            }

            // The bottom padding keeps the last row of content clear of the fixed navigation bar.
            main id="main-content" class="flex-1 overflow-y-auto pb-28"
            {
                (content)
            }

            (nav_bar.bottom_html())
        }
    };

    base(title, head_elements, &frame)
}

fn storage_banner(storage_mode: &StorageMode) -> Markup {
    let reason = match storage_mode {
        StorageMode::Degraded { reason } => {
            format!("The database could not be opened ({reason}).")
        }
        _ => "No database file was configured.".to_owned(),
    };

    html! {
        div
            id="storage-banner"
            role="status"
            class="px-4 py-2 text-sm text-center text-yellow-900 bg-yellow-100
                dark:bg-yellow-900 dark:text-yellow-100"
        {
            (reason) " Changes will be lost when the server restarts."
        }
    }
}

#[cfg(test)]
mod layout_tests {
    use std::path::PathBuf;

    use maud::html;
    use scraper::{Html, Selector};

    use crate::{db::StorageMode, endpoints};

    use super::layout;

    fn persistent() -> StorageMode {
        StorageMode::Persistent {
            path: PathBuf::from("ledger.db"),
        }
    }

    fn render(storage_mode: &StorageMode) -> Html {
        let markup = layout(
            "Test",
            endpoints::DASHBOARD_VIEW,
            storage_mode,
            &[],
            &html!(p id="content" { "Hello" }),
        );

        Html::parse_document(&markup.into_string())
    }

    #[test]
    fn main_sits_between_header_and_bottom_nav() {
        let document = render(&persistent());

        let selector = Selector::parse("#app-frame > *").unwrap();
        let ids: Vec<&str> = document
            .select(&selector)
            .filter_map(|element| element.value().id())
            .collect();

        assert_eq!(ids, vec!["top-nav", "main-content", "bottom-nav"]);
    }

    #[test]
    fn content_is_rendered_inside_main() {
        let document = render(&persistent());

        let selector = Selector::parse("main#main-content #content").unwrap();
        assert_eq!(document.select(&selector).count(), 1);
    }

    #[test]
    fn mounts_exactly_one_modal_handler() {
        let document = render(&persistent());

        let selector = Selector::parse("#global-modal").unwrap();
        assert_eq!(document.select(&selector).count(), 1);
    }

    #[test]
    fn no_banner_for_persistent_storage() {
        let document = render(&persistent());

        let selector = Selector::parse("#storage-banner").unwrap();
        assert_eq!(document.select(&selector).count(), 0);
    }

    #[test]
    fn banner_for_degraded_storage() {
        let document = render(&StorageMode::Degraded {
            reason: "disk full".to_owned(),
        });

        let selector = Selector::parse("#storage-banner").unwrap();
        let banner = document.select(&selector).next().expect("no storage banner");
        let text: String = banner.text().collect();
        assert!(text.contains("disk full"), "got banner text {text:?}");
        assert!(text.contains("lost"), "got banner text {text:?}");
    }
}

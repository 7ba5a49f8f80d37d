//! Record extraction from listing and detail pages
//!
//! The harvest pipeline only depends on [`RecordParser`]. The bundled
//! [`ShelfPageParser`] reads shelf listing pages (`.elementList` entries) and
//! book detail pages.

use crate::record::{DetailFields, Field, StubRecord};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Result of reading a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingParse {
    /// At least one entry was read
    Stubs(Vec<StubRecord>),

    /// The page contains no listing entries
    Empty,

    /// Listing entries exist but none could be read (markup changed?)
    Unrecognized { entries: usize },
}

/// Pluggable page extractor
pub trait RecordParser: Send + Sync {
    /// Reads the stubs on one listing page of `category`
    fn parse_listing(&self, html: &str, category: &str, page_url: &Url) -> ListingParse;

    /// Reads the detail fields on a record's own page
    fn parse_detail(&self, html: &str) -> DetailFields;
}

/// Parser for shelf listing and book detail markup
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelfPageParser;

impl ShelfPageParser {
    pub fn new() -> Self {
        Self
    }
}

impl RecordParser for ShelfPageParser {
    /// # Extraction Rules
    ///
    /// - `.bookTitle`: title; parenthesized text (series info) is dropped and
    ///   the part after the first `:` becomes the subtitle
    /// - `.authorName span`: author
    /// - `.greyText.smallText`: `avg rating X — N ratings — published Y`
    /// - `.leftAlignedImage[href]`: detail page link, resolved against the page URL
    ///
    /// Entries without a title are skipped.
    fn parse_listing(&self, html: &str, category: &str, page_url: &Url) -> ListingParse {
        let document = Html::parse_document(html);
        let Ok(entry_selector) = Selector::parse(".elementList") else {
            return ListingParse::Empty;
        };

        let mut entries = 0;
        let mut stubs = Vec::new();
        for element in document.select(&entry_selector) {
            entries += 1;
            match parse_entry(element, category, page_url) {
                Some(stub) => stubs.push(stub),
                None => tracing::debug!("Skipping listing entry without a title"),
            }
        }

        if entries == 0 {
            ListingParse::Empty
        } else if stubs.is_empty() {
            ListingParse::Unrecognized { entries }
        } else {
            ListingParse::Stubs(stubs)
        }
    }

    fn parse_detail(&self, html: &str) -> DetailFields {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let image = Selector::parse(".ResponsiveImage")
            .ok()
            .and_then(|selector| root.select(&selector).next())
            .and_then(|element| element.value().attr("src"))
            .map(Field::from_text)
            .unwrap_or_default();

        DetailFields {
            synopsis: select_text(root, "[data-testid=\"description\"]").into(),
            image,
            genres: extract_genres(root),
            author_bio: select_text(root, ".PageSection .DetailsLayoutRightParagraph .Formatted")
                .map(|bio| clean_author_bio(&bio))
                .into(),
            rating: select_text(root, ".RatingStatistics__rating").into(),
        }
    }
}

fn parse_entry(element: ElementRef<'_>, category: &str, page_url: &Url) -> Option<StubRecord> {
    let full_title = strip_parenthesized(&select_text(element, ".bookTitle")?);
    if full_title.is_empty() {
        return None;
    }

    let (title, subtitle) = match full_title.split_once(':') {
        Some((title, subtitle)) => (title.trim().to_string(), Field::from_text(subtitle)),
        None => (full_title.clone(), Field::Unset),
    };
    if title.is_empty() {
        return None;
    }

    let mut stub = StubRecord::new(title, category);
    stub.subtitle = subtitle;
    stub.author = select_text(element, ".authorName span").into();

    if let Some(grey_text) = select_text(element, ".greyText.smallText") {
        let stats = parse_listing_stats(&grey_text);
        stub.rating = stats.rating;
        stub.rating_count = stats.rating_count;
        stub.published = stats.published;
    }

    stub.url = Selector::parse(".leftAlignedImage")
        .ok()
        .and_then(|selector| element.select(&selector).next())
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .map(|url| Field::Set(url.to_string()))
        .unwrap_or_default();

    Some(stub)
}

/// Numbers carried by a listing entry's grey text
#[derive(Debug, Default, PartialEq, Eq)]
struct ListingStats {
    rating: Field,
    rating_count: Field,
    published: Field,
}

/// Parses `avg rating 4.35 — 1,234 ratings — published 2018`
fn parse_listing_stats(text: &str) -> ListingStats {
    let parts: Vec<&str> = text.split('—').map(str::trim).collect();

    let rating = parts
        .first()
        .and_then(|part| part.strip_prefix("avg rating"))
        .map(Field::from_text)
        .unwrap_or_default();

    let rating_count = parts
        .get(1)
        .and_then(|part| part.split_whitespace().next())
        .map(|count| Field::from_text(count.replace(',', "")))
        .unwrap_or_default();

    let published = text
        .rsplit_once("published")
        .map(|(_, year)| Field::from_text(year))
        .unwrap_or_default();

    ListingStats {
        rating,
        rating_count,
        published,
    }
}

fn extract_genres(root: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) =
        Selector::parse("[data-testid=\"genresList\"] .Button--tag .Button__labelItem")
    else {
        return Vec::new();
    };

    root.select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|genre| !genre.is_empty() && genre.to_lowercase() != "...more")
        .collect()
}

/// Drops librarian notes and collapses whitespace
fn clean_author_bio(bio: &str) -> String {
    let bio = match bio.split_once("Librarian Note:") {
        Some((before, _)) => before.trim().split("\n\n").next().unwrap_or_default(),
        None => bio,
    };
    bio.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes `(...)` groups together with the whitespace before them
fn strip_parenthesized(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                if depth == 0 {
                    let trimmed = out.trim_end().len();
                    out.truncate(trimmed);
                }
                depth += 1;
            }
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Trimmed text of the first match of `css` under `element`
fn select_text(element: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    element
        .select(&selector)
        .next()
        .map(|found| found.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

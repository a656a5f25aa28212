//! Headword → paradigm page, following disambiguation listings.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::source::{FetchError, LexiconSource};

/// Word-type badge text of entries worth following.
pub const VERB_BADGE: &str = "Verb";

static LISTING: LazyLock<Selector> = LazyLock::new(|| selector("div#testimonials-1"));
static ENTRY: LazyLock<Selector> = LazyLock::new(|| selector("li.list-group-item.list-toggle"));
static BADGE: LazyLock<Selector> =
    LazyLock::new(|| selector("span.badge.badge-orange.rounded.badge-wordtype"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// One entry of a disambiguation listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub word_type: String,
    pub href: String,
}

impl Candidate {
    pub fn is_verb(&self) -> bool {
        self.word_type == VERB_BADGE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retrieval {
    /// Markup of the page holding the verb paradigm.
    Document(String),
    /// The source lists the headword, but not as a verb.
    NotFound,
}

/// Parse the candidates of a disambiguation page.
///
/// Returns `None` when `markup` is not a disambiguation page. Entries without
/// a badge or link are skipped.
pub fn disambiguation_candidates(markup: &str) -> Option<Vec<Candidate>> {
    let document = Html::parse_document(markup);
    let listing = document.select(&LISTING).next()?;
    let candidates = listing
        .select(&ENTRY)
        .filter_map(|entry| {
            let badge = entry.select(&BADGE).next()?;
            let link = entry.select(&LINK).next()?;
            Some(Candidate {
                label: text_of(link),
                word_type: text_of(badge),
                href: link.value().attr("href")?.to_string(),
            })
        })
        .collect();
    Some(candidates)
}

/// Fetch the paradigm page for `headword`.
///
/// Disambiguation pages are resolved to their first verb entry; when there is
/// none the word is [`Retrieval::NotFound`] and no second request is made.
pub fn retrieve<S>(source: &S, headword: &str) -> Result<Retrieval, FetchError>
where
    S: LexiconSource + ?Sized,
{
    let markup = source.fetch_document(headword)?;
    let Some(candidates) = disambiguation_candidates(&markup) else {
        return Ok(Retrieval::Document(markup));
    };
    let Some(verb) = candidates.into_iter().find(Candidate::is_verb) else {
        debug!("{headword}: disambiguation page lists no verb");
        return Ok(Retrieval::NotFound);
    };
    let target = source.base_url().join(&verb.href)?;
    debug!("{headword}: following verb entry {} to {target}", verb.label);
    source.fetch_url(&target).map(Retrieval::Document)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

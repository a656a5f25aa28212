use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use latin_paradigm::{Case, Category, CategoryTree, Form, Gender, Number, ParadigmStore};
use latin_scrape::{
    BatchOptions, ExtractOptions, FailureKind, FetchError, Harvester, LexiconSource, Retrieval,
    extract, retrieve,
};
use url::Url;

const AMARE: &str = include_str!("fixtures/amare.html");
const LEGERE: &str = include_str!("fixtures/legere.html");
const LEGERE_LISTING: &str = include_str!("fixtures/legere_listing.html");
const LEX_LISTING: &str = include_str!("fixtures/lex_listing.html");

/// In-memory lexicon serving fixture pages.
struct FixtureLexicon {
    base: Url,
    pages: HashMap<&'static str, &'static str>,
    links: HashMap<String, &'static str>,
    requests: Mutex<Vec<String>>,
}

impl FixtureLexicon {
    fn new() -> Self {
        let base = Url::parse("https://lexicon.test/lateinwoerterbuch/").unwrap();
        let pages = HashMap::from([
            ("amare", AMARE),
            ("legere", LEGERE_LISTING),
            ("lex", LEX_LISTING),
        ]);
        let links = HashMap::from([(
            "https://lexicon.test/lateinwoerterbuch/legere-uebersetzung-2.html".to_string(),
            LEGERE,
        )]);
        Self {
            base,
            pages,
            links,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn not_found(url: String) -> FetchError {
        FetchError::Status { url, status: 404 }
    }
}

impl LexiconSource for FixtureLexicon {
    fn base_url(&self) -> &Url {
        &self.base
    }

    fn fetch_document(&self, headword: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(headword.to_string());
        self.pages
            .get(headword)
            .map(|page| page.to_string())
            .ok_or_else(|| Self::not_found(headword.to_string()))
    }

    fn fetch_url(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.links
            .get(url.as_str())
            .map(|page| page.to_string())
            .ok_or_else(|| Self::not_found(url.to_string()))
    }
}

#[test]
fn extracts_full_page() {
    let extraction = extract(AMARE, ExtractOptions::default()).unwrap();
    assert_eq!(extraction.headword, "amare");
    let paradigm = &extraction.paradigm;

    let categories: Vec<Category> = paradigm.categories().collect();
    assert_eq!(
        categories,
        vec![
            Category::PresentIndicative,
            Category::PerfectSubjunctive,
            Category::Imperative,
            Category::Infinitive,
            Category::Gerund,
            Category::Gerundive,
            Category::Participles,
            Category::Supine,
        ]
    );

    assert_eq!(
        paradigm.lookup("Indikativ Präsens", "Passiv", "2. Person Singular"),
        Some(&Form::attested("amāris"))
    );
    assert_eq!(
        paradigm.lookup("Konjunktiv Perfekt", "Aktiv", "3. Person Plural"),
        Some(&Form::attested("amaverint"))
    );
    assert_eq!(
        paradigm.lookup("Imperativ", "Imperativ I", "2. Person Plural"),
        Some(&Form::attested("amate"))
    );
    assert_eq!(
        paradigm.lookup("Imperativ", "Imperativ II", "3. Person Plural"),
        Some(&Form::attested("amanto"))
    );
    assert_eq!(
        paradigm.lookup("Infinitiv", "Passiv", "Futur"),
        Some(&Form::Missing)
    );

    let Some(CategoryTree::Gerundive(gerundive)) = paradigm.get(Category::Gerundive) else {
        panic!("gerundive missing");
    };
    assert_eq!(
        gerundive[&Number::Plural][&Case::Nominative].get(Gender::Neuter),
        &Form::attested("amanda")
    );

    let Some(CategoryTree::Participles(participles)) = paradigm.get(Category::Participles) else {
        panic!("participles missing");
    };
    assert_eq!(participles.len(), 3);
    let pfa = &participles[&latin_paradigm::ParticipleKind::FutureActive];
    assert_eq!(
        pfa[&Number::Singular][&Case::Nominative].masculine,
        Form::attested("amaturus")
    );
}

#[test]
fn retriever_follows_first_verb_entry() {
    let lexicon = FixtureLexicon::new();
    let Retrieval::Document(markup) = retrieve(&lexicon, "legere").unwrap() else {
        panic!("legere should resolve");
    };
    assert_eq!(extract(&markup, ExtractOptions::default()).unwrap().headword, "legere");
    assert_eq!(
        lexicon.requests(),
        vec![
            "legere".to_string(),
            "https://lexicon.test/lateinwoerterbuch/legere-uebersetzung-2.html".to_string(),
        ]
    );
}

#[test]
fn listing_without_verb_is_not_found() {
    let lexicon = FixtureLexicon::new();
    assert_eq!(retrieve(&lexicon, "lex").unwrap(), Retrieval::NotFound);
    assert_eq!(lexicon.requests(), vec!["lex".to_string()]);
}

#[test]
fn batch_reports_successes_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let store = ParadigmStore::new().into_shared();
    let harvester = Harvester::new(Arc::new(FixtureLexicon::new()), Arc::clone(&store))
        .with_store_path(&path)
        .with_max_workers(2);

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));
    let batch = {
        let calls = Arc::clone(&calls);
        let seen = Arc::clone(&seen);
        harvester
            .update(
                &["amare".to_string(), " legere ".to_string(), "nescio".to_string()],
                BatchOptions {
                    exclude_supina: false,
                    save: true,
                },
                move |report| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    *seen.lock().unwrap() = Some(report.succeeded.len() + report.failed.len());
                },
            )
            .unwrap()
    };
    let mut report = batch.join();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), Some(3));
    report.succeeded.sort();
    assert_eq!(report.succeeded, vec!["amare".to_string(), "legere".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].query, "nescio");
    assert_eq!(report.failed[0].kind, FailureKind::Fetch);

    assert_eq!(store.read().unwrap().len(), 2);
    assert_eq!(ParadigmStore::load(&path).len(), 2);
}

#[test]
fn ensure_contains_only_fetches_missing_words() {
    let lexicon = Arc::new(FixtureLexicon::new());
    let store = ParadigmStore::new().into_shared();
    let harvester = Harvester::new(lexicon.clone(), Arc::clone(&store));

    let words = vec!["amare".to_string(), "lex".to_string()];
    let report = harvester
        .ensure_contains(&words, BatchOptions::default(), |_| {})
        .unwrap()
        .join();
    assert_eq!(report.succeeded, vec!["amare".to_string()]);
    assert_eq!(report.failed[0].kind, FailureKind::NoVerbEntry);

    let calls = Arc::new(AtomicUsize::new(0));
    let batch = {
        let calls = Arc::clone(&calls);
        harvester
            .ensure_contains(&["amare".to_string()], BatchOptions::default(), move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
    };
    assert!(!batch.is_active());
    assert_eq!(batch.join(), Default::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(lexicon.requests().len(), 2);
}

#[test]
fn refresh_all_refetches_stored_words() {
    let lexicon = Arc::new(FixtureLexicon::new());
    let store = ParadigmStore::new().into_shared();
    let harvester = Harvester::new(lexicon.clone(), Arc::clone(&store));
    harvester
        .update(&["amare".to_string()], BatchOptions::default(), |_| {})
        .unwrap()
        .join();

    let report = harvester
        .refresh_all(BatchOptions::default(), |_| {})
        .unwrap()
        .join();
    assert_eq!(report.succeeded, vec!["amare".to_string()]);
    assert_eq!(lexicon.requests(), vec!["amare".to_string(), "amare".to_string()]);
}

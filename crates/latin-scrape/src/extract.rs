//! Paradigm page markup → typed [`Paradigm`].
//!
//! The conjugation container (`div#vtab-1`) alternates heading elements and
//! blocks of tables. Each block uses one of two layouts:
//!
//! * regular: label/form rows; the first table is active, further tables
//!   are passive (a one-table block switches to passive at a `Passiv` row).
//! * declined: a `Maskulinum Femininum Neutrum` header, case rows with three
//!   gendered cells; tables alternate Singular/Plural over PPP, PPA and PFA.
//!
//! Rows are collected first and mapped onto the category's typed tree
//! afterwards, so any unexpected label fails the whole page.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use latin_paradigm::{
    Case, Category, CategoryTree, DeclensionTable, Form, FormTable, GenderForms, ImperativeForm,
    InfinitiveTime, Number, Paradigm, ParadigmError, ParticipleKind, Person, Shape, Voice,
};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div#vtab-1"));
static HEADER: LazyLock<Selector> = LazyLock::new(|| selector("div.table-responsive"));
static HEADWORD: LazyLock<Selector> = LazyLock::new(|| selector("td.eh2"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static FOOTNOTE: LazyLock<Selector> = LazyLock::new(|| selector("span.f"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

const DECLINED_HEADER: &str = "MaskulinumFemininumNeutrum";
const REGULAR_SKIP: &[&str] = &["Passiv", "LateinDeutsch", "Latein", "Aktiv", "SupinISupinII"];
const DECLINED_SKIP: &[&str] = &["Passiv", "LateinDeutsch", "Latein", "Aktiv", DECLINED_HEADER];

#[derive(Clone, Copy, Debug, Default)]
pub struct ExtractOptions {
    /// Drop the supine block instead of requiring it.
    pub exclude_supina: bool,
}

/// A page's citation form and its paradigm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    pub headword: String,
    pub paradigm: Paradigm,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("page has no conjugation container")]
    MissingContainer,
    #[error("page has no headword cell")]
    MissingHeadword,
    #[error("{category} block has no table")]
    NoTable { category: Category },
    #[error("{category} row has {found} cells, expected at least {expected}")]
    ShortRow {
        category: Category,
        found: usize,
        expected: usize,
    },
    #[error("{category} row has unknown label `{label}`")]
    UnknownLabel { category: Category, label: String },
    #[error("{category} block has unexpected layout: {reason}")]
    UnexpectedLayout {
        category: Category,
        reason: &'static str,
    },
    #[error("page has no Supina block")]
    MissingSupine,
    #[error("Supina block has {0} entries, expected 2")]
    SupineEntries(usize),
    #[error("page yields an empty paradigm")]
    Empty,
    #[error(transparent)]
    Shape(#[from] ParadigmError),
}

type Rows = Vec<(String, Form)>;

enum Block {
    Regular { active: Rows, passive: Rows },
    Declined(BTreeMap<ParticipleKind, DeclensionTable>),
}

/// Extract the paradigm from a verb page.
pub fn extract(markup: &str, options: ExtractOptions) -> Result<Extraction, ExtractError> {
    let document = Html::parse_document(markup);
    let container = document
        .select(&CONTAINER)
        .next()
        .ok_or(ExtractError::MissingContainer)?;
    // Only the first header block names the headword.
    let headword = document
        .select(&HEADER)
        .next()
        .and_then(|header| header.select(&HEADWORD).next())
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|headword| !headword.is_empty())
        .ok_or(ExtractError::MissingHeadword)?;

    let children: Vec<ElementRef<'_>> = container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| !squash(*child).is_empty())
        .collect();

    let mut paradigm = Paradigm::new();
    let mut saw_supine = false;
    for pair in children.chunks_exact(2) {
        let heading = pair[0].text().collect::<String>();
        let Some(category) = Category::from_label(&heading) else {
            debug!("{headword}: skipping unknown heading `{}`", heading.trim());
            continue;
        };
        if category == Category::Supine {
            saw_supine = true;
            if options.exclude_supina {
                continue;
            }
        }
        let block = read_block(category, pair[1])?;
        let tree = build_tree(category, block)?;
        if tree.is_empty() {
            debug!("{headword}: {category} block is empty");
            continue;
        }
        paradigm.insert(category, tree)?;
    }

    if !options.exclude_supina && !saw_supine {
        return Err(ExtractError::MissingSupine);
    }
    if paradigm.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(Extraction { headword, paradigm })
}

fn read_block(category: Category, block: ElementRef<'_>) -> Result<Block, ExtractError> {
    let tables: Vec<ElementRef<'_>> = block.select(&TABLE).collect();
    let first_row = tables
        .first()
        .ok_or(ExtractError::NoTable { category })?
        .select(&ROW)
        .next();
    if first_row.is_some_and(|row| squash(row) == DECLINED_HEADER) {
        read_declined(category, &tables).map(Block::Declined)
    } else {
        read_regular(category, &tables)
    }
}

fn read_regular(category: Category, tables: &[ElementRef<'_>]) -> Result<Block, ExtractError> {
    let mut active = Rows::new();
    let mut passive = Rows::new();
    let mut switched = false;
    for (i, table) in tables.iter().enumerate() {
        for row in table.select(&ROW) {
            let text = squash(row);
            if REGULAR_SKIP.contains(&text.as_str()) {
                if tables.len() == 1 && text == "Passiv" {
                    switched = true;
                }
                continue;
            }
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() < 2 {
                return Err(ExtractError::ShortRow {
                    category,
                    found: cells.len(),
                    expected: 2,
                });
            }
            let entry = (plain_text(cells[0]), form_of(cells[1]));
            if i == 0 && !switched {
                active.push(entry);
            } else {
                passive.push(entry);
            }
        }
    }
    Ok(Block::Regular { active, passive })
}

fn read_declined(
    category: Category,
    tables: &[ElementRef<'_>],
) -> Result<BTreeMap<ParticipleKind, DeclensionTable>, ExtractError> {
    let mut declined: BTreeMap<ParticipleKind, DeclensionTable> = BTreeMap::new();
    for (i, table) in tables.iter().enumerate() {
        let kind = match i {
            0 | 1 => ParticipleKind::PerfectPassive,
            2 | 3 => ParticipleKind::PresentActive,
            _ => ParticipleKind::FutureActive,
        };
        let number = if i % 2 == 0 {
            Number::Singular
        } else {
            Number::Plural
        };
        for row in table.select(&ROW) {
            if DECLINED_SKIP.contains(&squash(row).as_str()) {
                continue;
            }
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() < 4 {
                return Err(ExtractError::ShortRow {
                    category,
                    found: cells.len(),
                    expected: 4,
                });
            }
            let case = parse_label(category, &plain_text(cells[0]), Case::from_label)?;
            let forms = GenderForms {
                masculine: form_of(cells[1]),
                feminine: form_of(cells[2]),
                neuter: form_of(cells[3]),
            };
            declined
                .entry(kind)
                .or_default()
                .entry(number)
                .or_default()
                .insert(case, forms);
        }
    }
    Ok(declined)
}

fn build_tree(category: Category, block: Block) -> Result<CategoryTree, ExtractError> {
    match (category.shape(), block) {
        (Shape::Finite, Block::Regular { active, passive }) => Ok(CategoryTree::Finite(
            by_voice(category, active, passive, Person::from_label)?,
        )),
        (Shape::Infinitive, Block::Regular { active, passive }) => Ok(CategoryTree::Infinitive(
            by_voice(category, active, passive, InfinitiveTime::from_label)?,
        )),
        (Shape::Imperative, Block::Regular { active, passive }) => {
            let mut table = BTreeMap::new();
            for (form, rows) in [
                (ImperativeForm::First, active),
                (ImperativeForm::Second, passive),
            ] {
                if !rows.is_empty() {
                    table.insert(form, keyed(category, rows, Person::from_label)?);
                }
            }
            Ok(CategoryTree::Imperative(table))
        }
        (Shape::Gerund, Block::Regular { active, passive }) => {
            if !passive.is_empty() {
                return Err(ExtractError::UnexpectedLayout {
                    category,
                    reason: "gerund has a passive table",
                });
            }
            Ok(CategoryTree::Gerund(keyed(
                category,
                active,
                Case::from_label,
            )?))
        }
        (Shape::Supine, Block::Regular { active, passive }) => {
            if !passive.is_empty() {
                return Err(ExtractError::UnexpectedLayout {
                    category,
                    reason: "supine has a passive table",
                });
            }
            transpose_supine(active).map(CategoryTree::Supine)
        }
        (Shape::Gerundive, Block::Declined(mut declined)) => declined
            .remove(&ParticipleKind::PerfectPassive)
            .map(CategoryTree::Gerundive)
            .ok_or(ExtractError::UnexpectedLayout {
                category,
                reason: "gerundive has no PPP tables",
            }),
        (Shape::Participles, Block::Declined(declined)) => Ok(CategoryTree::Participles(declined)),
        (_, Block::Declined(_)) => Err(ExtractError::UnexpectedLayout {
            category,
            reason: "declined tables in a conjugated block",
        }),
        (_, Block::Regular { .. }) => Err(ExtractError::UnexpectedLayout {
            category,
            reason: "label/form rows in a declined block",
        }),
    }
}

fn by_voice<K: Ord>(
    category: Category,
    active: Rows,
    passive: Rows,
    parse: fn(&str) -> Option<K>,
) -> Result<BTreeMap<Voice, FormTable<K>>, ExtractError> {
    let mut table = BTreeMap::new();
    for (voice, rows) in [(Voice::Active, active), (Voice::Passive, passive)] {
        if !rows.is_empty() {
            table.insert(voice, keyed(category, rows, parse)?);
        }
    }
    Ok(table)
}

fn keyed<K: Ord>(
    category: Category,
    rows: Rows,
    parse: fn(&str) -> Option<K>,
) -> Result<FormTable<K>, ExtractError> {
    rows.into_iter()
        .map(|(label, form)| Ok((parse_label(category, &label, parse)?, form)))
        .collect()
}

fn parse_label<K>(
    category: Category,
    label: &str,
    parse: fn(&str) -> Option<K>,
) -> Result<K, ExtractError> {
    parse(label).ok_or_else(|| ExtractError::UnknownLabel {
        category,
        label: label.to_string(),
    })
}

/// Re-key the two supine rows `[(k1, v1), (k2, v2)]` as `{k1: k2, v1: v2}`.
///
/// Stored data has always had this shape, so it is kept for compatibility.
fn transpose_supine(rows: Rows) -> Result<BTreeMap<String, Form>, ExtractError> {
    let [(k1, v1), (k2, v2)]: [(String, Form); 2] = rows
        .try_into()
        .map_err(|rows: Rows| ExtractError::SupineEntries(rows.len()))?;
    Ok(BTreeMap::from([
        (k1, Form::from_cell(&k2)),
        (v1.as_str().to_string(), v2),
    ]))
}

/// Cell value: the lone footnote span's text if there is exactly one, else the whole cell.
fn form_of(cell: ElementRef<'_>) -> Form {
    let mut footnotes = cell.select(&FOOTNOTE);
    match (footnotes.next(), footnotes.next()) {
        (Some(span), None) => Form::from_cell(&span.text().collect::<String>()),
        _ => Form::from_cell(&cell.text().collect::<String>()),
    }
}

fn plain_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Element text with all whitespace removed, for header matching.
fn squash(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

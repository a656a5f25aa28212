//! Typed Latin verb paradigms as scraped from frag-caesar.de.
//!
//! A [`Paradigm`] maps each [`Category`] (a finite tense, the imperative,
//! the infinitive, gerund, gerundive, participles or supine) to a
//! [`CategoryTree`] whose shape is fixed per category. Every axis is a
//! closed label enum ([`Voice`], [`Person`], [`Case`], ...) that renders to
//! the German label used by the source pages and the persisted JSON, so a
//! paradigm round-trips through `serde_json` without any open-ended keys.
//!
//! Leaves are [`Form`]s: either an attested word form or the
//! "existiert nicht" sentinel for combinations the language lacks.
//!
//! ```rust
//! use latin_paradigm::{Category, Person, Voice};
//!
//! let tense = Category::from_label("Indikativ Präsens").unwrap();
//! assert!(tense.is_finite());
//! assert_eq!(Voice::from_label("Aktiv"), Some(Voice::Active));
//! assert_eq!(Person::FirstSingular.label(), "1. Person Singular");
//! ```
//!
//! Persistence lives in [`store`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod store;

pub use store::{ParadigmStore, SharedStore, StoreError};

/// Cell text the source uses for forms that do not exist.
pub const MISSING_MARKER: &str = "existiert nicht";

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// German label as printed by the source and stored on disk.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Parse a label (surrounding whitespace ignored).
            pub fn from_label(raw: &str) -> Option<Self> {
                match raw.trim() {
                    $($label $(| $alias)* => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $name::from_label(&raw).ok_or_else(|| {
                    de::Error::custom(format!(
                        "unknown {} label `{}`",
                        stringify!($name),
                        raw
                    ))
                })
            }
        }
    };
}

labelled_enum! {
    /// Grammatical grouping of a paradigm, in canonical weighting order.
    pub enum Category {
        PresentIndicative => "Indikativ Präsens",
        ImperfectIndicative => "Indikativ Imperfekt",
        PerfectIndicative => "Indikativ Perfekt",
        PluperfectIndicative => "Indikativ Plusquamperfekt",
        FutureIndicative => "Indikativ Futur I",
        FuturePerfectIndicative => "Indikativ Futur II",
        PresentSubjunctive => "Konjunktiv Präsens",
        ImperfectSubjunctive => "Konjunktiv Imperfekt",
        PerfectSubjunctive => "Konjunktiv Perfekt",
        PluperfectSubjunctive => "Konjunktiv Plusquamperfekt",
        Imperative => "Imperativ" | "Imperative",
        Infinitive => "Infinitiv" | "Infinite",
        Gerund => "Gerundium",
        Gerundive => "Gerundivum",
        Participles => "Partizipien",
        Supine => "Supina",
    }
}

labelled_enum! {
    pub enum Voice {
        Active => "Aktiv",
        Passive => "Passiv",
    }
}

labelled_enum! {
    pub enum Person {
        FirstSingular => "1. Person Singular",
        SecondSingular => "2. Person Singular",
        ThirdSingular => "3. Person Singular",
        FirstPlural => "1. Person Plural",
        SecondPlural => "2. Person Plural",
        ThirdPlural => "3. Person Plural",
    }
}

labelled_enum! {
    /// Time axis of the infinitive block.
    pub enum InfinitiveTime {
        Present => "Präsens",
        Perfect => "Perfekt",
        Future => "Futur" | "Futur I",
    }
}

labelled_enum! {
    pub enum Case {
        Nominative => "Nominativ",
        Genitive => "Genitiv",
        Dative => "Dativ",
        Accusative => "Akkusativ",
        Vocative => "Vokativ",
        Ablative => "Ablativ",
    }
}

labelled_enum! {
    /// Number axis of participle tables (the source calls it the mood bucket).
    pub enum Number {
        Singular => "Singular",
        Plural => "Plural",
    }
}

labelled_enum! {
    pub enum Gender {
        Masculine => "Maskulinum",
        Feminine => "Femininum",
        Neuter => "Neutrum",
    }
}

labelled_enum! {
    pub enum ParticipleKind {
        PerfectPassive => "PPP",
        PresentActive => "PPA",
        FutureActive => "PFA",
    }
}

labelled_enum! {
    /// The two imperative ordinals, carried by the source as an Aktiv/Passiv split.
    pub enum ImperativeForm {
        First => "Imperativ I",
        Second => "Imperativ II",
    }
}

/// Structural shape a category's tree must have.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    Finite,
    Imperative,
    Infinitive,
    Gerund,
    Gerundive,
    Participles,
    Supine,
}

impl Category {
    /// Number of slots in the canonical order.
    pub const COUNT: usize = 16;

    /// Position in the canonical order (index into weight vectors).
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the ten indicative/subjunctive tenses.
    pub fn is_finite(self) -> bool {
        self.shape() == Shape::Finite
    }

    pub fn shape(self) -> Shape {
        match self {
            Category::Imperative => Shape::Imperative,
            Category::Infinitive => Shape::Infinitive,
            Category::Gerund => Shape::Gerund,
            Category::Gerundive => Shape::Gerundive,
            Category::Participles => Shape::Participles,
            Category::Supine => Shape::Supine,
            _ => Shape::Finite,
        }
    }
}

/// A single paradigm cell.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Form {
    Attested(String),
    /// The language has no form for this combination.
    Missing,
}

impl Form {
    /// Interpret scraped cell text; empty cells and the marker become [`Form::Missing`].
    pub fn from_cell(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.contains(MISSING_MARKER) {
            Form::Missing
        } else {
            Form::Attested(text.to_string())
        }
    }

    pub fn attested(text: impl Into<String>) -> Self {
        Form::Attested(text.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Form::Missing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Form::Attested(text) => text,
            Form::Missing => MISSING_MARKER,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Form {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Form {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.contains(MISSING_MARKER) {
            Ok(Form::Missing)
        } else {
            Ok(Form::Attested(raw))
        }
    }
}

/// Masculine, feminine and neuter forms of one declined cell.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GenderForms {
    #[serde(rename = "Maskulinum")]
    pub masculine: Form,
    #[serde(rename = "Femininum")]
    pub feminine: Form,
    #[serde(rename = "Neutrum")]
    pub neuter: Form,
}

impl GenderForms {
    pub fn get(&self, gender: Gender) -> &Form {
        match gender {
            Gender::Masculine => &self.masculine,
            Gender::Feminine => &self.feminine,
            Gender::Neuter => &self.neuter,
        }
    }

    /// Forms in masculine, feminine, neuter order.
    pub fn to_vec(&self) -> Vec<Form> {
        vec![
            self.masculine.clone(),
            self.feminine.clone(),
            self.neuter.clone(),
        ]
    }
}

pub type FormTable<K> = BTreeMap<K, Form>;
pub type VoiceTable<K> = BTreeMap<Voice, FormTable<K>>;
/// Number → Case → gendered forms, shared by participles and the gerundive.
pub type DeclensionTable = BTreeMap<Number, BTreeMap<Case, GenderForms>>;

/// Typed body of one category.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryTree {
    Finite(VoiceTable<Person>),
    Imperative(BTreeMap<ImperativeForm, FormTable<Person>>),
    Infinitive(VoiceTable<InfinitiveTime>),
    Gerund(FormTable<Case>),
    Gerundive(DeclensionTable),
    Participles(BTreeMap<ParticipleKind, DeclensionTable>),
    /// Keys are whatever the supine re-keying produced; see the scraper's extractor.
    Supine(BTreeMap<String, Form>),
}

impl CategoryTree {
    pub fn shape(&self) -> Shape {
        match self {
            CategoryTree::Finite(_) => Shape::Finite,
            CategoryTree::Imperative(_) => Shape::Imperative,
            CategoryTree::Infinitive(_) => Shape::Infinitive,
            CategoryTree::Gerund(_) => Shape::Gerund,
            CategoryTree::Gerundive(_) => Shape::Gerundive,
            CategoryTree::Participles(_) => Shape::Participles,
            CategoryTree::Supine(_) => Shape::Supine,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CategoryTree::Finite(t) => t.values().all(BTreeMap::is_empty),
            CategoryTree::Imperative(t) => t.values().all(BTreeMap::is_empty),
            CategoryTree::Infinitive(t) => t.values().all(BTreeMap::is_empty),
            CategoryTree::Gerund(t) => t.is_empty(),
            CategoryTree::Gerundive(t) => t.values().all(BTreeMap::is_empty),
            CategoryTree::Participles(t) => t
                .values()
                .all(|table| table.values().all(BTreeMap::is_empty)),
            CategoryTree::Supine(t) => t.is_empty(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParadigmError {
    #[error("category {category} expects a {expected:?} tree, got {found:?}")]
    ShapeMismatch {
        category: Category,
        expected: Shape,
        found: Shape,
    },
}

/// Every extracted category of one headword.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Paradigm {
    categories: BTreeMap<Category, CategoryTree>,
}

impl Paradigm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a category tree, rejecting trees whose shape does not fit the category.
    pub fn insert(
        &mut self,
        category: Category,
        tree: CategoryTree,
    ) -> Result<Option<CategoryTree>, ParadigmError> {
        if tree.shape() != category.shape() {
            return Err(ParadigmError::ShapeMismatch {
                category,
                expected: category.shape(),
                found: tree.shape(),
            });
        }
        Ok(self.categories.insert(category, tree))
    }

    pub fn get(&self, category: Category) -> Option<&CategoryTree> {
        self.categories.get(&category)
    }

    /// Available categories in canonical order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Resolve a `tense / voice / person` label path.
    ///
    /// Works for the finite tenses, the infinitive (the third label is the
    /// time) and the imperative (the second label is the ordinal). Any
    /// unknown label or missing level yields `None`.
    pub fn lookup(&self, tense: &str, voice: &str, person: &str) -> Option<&Form> {
        let category = Category::from_label(tense)?;
        match self.categories.get(&category)? {
            CategoryTree::Finite(table) => table
                .get(&Voice::from_label(voice)?)?
                .get(&Person::from_label(person)?),
            CategoryTree::Infinitive(table) => table
                .get(&Voice::from_label(voice)?)?
                .get(&InfinitiveTime::from_label(person)?),
            CategoryTree::Imperative(table) => table
                .get(&ImperativeForm::from_label(voice)?)?
                .get(&Person::from_label(person)?),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Paradigm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ParadigmVisitor)
    }
}

/// A voice table as stored. Files written by older versions keep a tense
/// without passive forms as a bare table; it is read as active only.
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "K: Deserialize<'de> + Ord"))]
enum StoredVoiceTable<K> {
    ByVoice(VoiceTable<K>),
    ActiveOnly(FormTable<K>),
}

impl<K: Ord> StoredVoiceTable<K> {
    fn into_table(self) -> VoiceTable<K> {
        match self {
            StoredVoiceTable::ByVoice(table) => table,
            StoredVoiceTable::ActiveOnly(forms) => BTreeMap::from([(Voice::Active, forms)]),
        }
    }
}

struct ParadigmVisitor;

impl<'de> Visitor<'de> for ParadigmVisitor {
    type Value = Paradigm;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of category labels to category tables")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Paradigm, A::Error> {
        let mut categories = BTreeMap::new();
        while let Some(category) = map.next_key::<Category>()? {
            let tree = match category.shape() {
                Shape::Finite => {
                    CategoryTree::Finite(map.next_value::<StoredVoiceTable<_>>()?.into_table())
                }
                Shape::Imperative => CategoryTree::Imperative(map.next_value()?),
                Shape::Infinitive => {
                    CategoryTree::Infinitive(map.next_value::<StoredVoiceTable<_>>()?.into_table())
                }
                Shape::Gerund => CategoryTree::Gerund(map.next_value()?),
                Shape::Gerundive => CategoryTree::Gerundive(map.next_value()?),
                Shape::Participles => CategoryTree::Participles(map.next_value()?),
                Shape::Supine => CategoryTree::Supine(map.next_value()?),
            };
            categories.insert(category, tree);
        }
        Ok(Paradigm { categories })
    }
}

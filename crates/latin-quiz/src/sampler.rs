//! Weighted random questions over stored paradigms.
//!
//! A draw picks a headword uniformly, a category by weight among the
//! categories that headword has, then walks down the category's tree
//! choosing each level uniformly. Draws that land on a missing form (or an
//! empty branch) are retried up to [`QuizOptions::max_attempts`] times.

use std::collections::{BTreeMap, BTreeSet};

use latin_paradigm::{
    Category, CategoryTree, DeclensionTable, Form, Gender, GenderForms, ImperativeForm,
    Paradigm, ParadigmStore,
};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::{IteratorRandom, SliceRandom};
use serde::Serialize;
use thiserror::Error;

use crate::weights::{ConfigError, WeightSpec, Weights};

pub const DEFAULT_MAX_ATTEMPTS: usize = 1_000;

#[derive(Clone, Debug)]
pub struct QuizOptions {
    pub weights: WeightSpec,
    /// Headwords never asked about.
    pub excluded_headwords: BTreeSet<String>,
    pub excluded_categories: BTreeSet<Category>,
    /// Ask for all three genders of a participle at once.
    pub ignore_gender_participles: bool,
    pub ignore_gender_gerundive: bool,
    /// Only ask for Imperativ I.
    pub exclude_imperativ_2: bool,
    /// Redraw instead of asking for forms that do not exist.
    pub exclude_missing: bool,
    pub max_attempts: usize,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            weights: WeightSpec::default(),
            excluded_headwords: BTreeSet::new(),
            excluded_categories: BTreeSet::from([Category::Supine]),
            ignore_gender_participles: false,
            ignore_gender_gerundive: false,
            exclude_imperativ_2: true,
            exclude_missing: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Single(Form),
    /// Any of the gendered forms is accepted.
    Any(Vec<Form>),
}

impl Answer {
    pub fn forms(&self) -> &[Form] {
        match self {
            Answer::Single(form) => std::slice::from_ref(form),
            Answer::Any(forms) => forms,
        }
    }

    pub fn has_missing(&self) -> bool {
        self.forms().iter().any(Form::is_missing)
    }

    /// Compare a guess, ignoring case and surrounding whitespace.
    pub fn accepts(&self, guess: &str) -> bool {
        let guess = guess.trim().to_lowercase();
        self.forms()
            .iter()
            .any(|form| form.as_str().trim().to_lowercase() == guess)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Question {
    pub headword: String,
    pub category: Category,
    pub text: String,
    pub answer: Answer,
}

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no headword left to ask about")]
    NoHeadword,
    #[error("no question found after {0} attempts")]
    Exhausted(usize),
}

/// Draw one question from `store`.
pub fn draw_question<R>(
    store: &ParadigmStore,
    options: &QuizOptions,
    rng: &mut R,
) -> Result<Question, SampleError>
where
    R: Rng + ?Sized,
{
    let supine_excluded = options.excluded_categories.contains(&Category::Supine);
    let mut weights = options.weights.resolve(supine_excluded)?;
    for &category in &options.excluded_categories {
        weights.exclude(category);
    }

    let headwords: Vec<(&str, &Paradigm)> = store
        .headwords()
        .filter_map(|headword| store.get(headword).map(|paradigm| (headword, paradigm)))
        .filter(|(headword, _)| !options.excluded_headwords.contains(*headword))
        .collect();
    if headwords.is_empty() {
        return Err(SampleError::NoHeadword);
    }

    for _ in 0..options.max_attempts {
        let Some(&(headword, paradigm)) = headwords.choose(rng) else {
            break;
        };
        let Some(question) = draw_once(headword, paradigm, &weights, options, rng) else {
            continue;
        };
        if options.exclude_missing && question.answer.has_missing() {
            continue;
        }
        return Ok(question);
    }
    Err(SampleError::Exhausted(options.max_attempts))
}

fn draw_once<R>(
    headword: &str,
    paradigm: &Paradigm,
    weights: &Weights,
    options: &QuizOptions,
    rng: &mut R,
) -> Option<Question>
where
    R: Rng + ?Sized,
{
    let available: Vec<Category> = paradigm
        .categories()
        .filter(|category| weights.get(*category) > 0.0)
        .collect();
    let index = WeightedIndex::new(available.iter().map(|c| weights.get(*c))).ok()?;
    let category = available[index.sample(rng)];
    let tree = paradigm.get(category)?;

    let mut labels: Vec<String> = Vec::new();
    let answer = match tree {
        CategoryTree::Finite(table) => {
            labels.push(category.label().to_string());
            let (voice, persons) = pick(table, rng)?;
            let (person, form) = pick(persons, rng)?;
            labels.extend([voice.label().to_string(), person.label().to_string()]);
            Answer::Single(form.clone())
        }
        CategoryTree::Infinitive(table) => {
            labels.push(category.label().to_string());
            let (voice, times) = pick(table, rng)?;
            let (time, form) = pick(times, rng)?;
            labels.extend([voice.label().to_string(), time.label().to_string()]);
            Answer::Single(form.clone())
        }
        CategoryTree::Imperative(table) => {
            labels.push(category.label().to_string());
            let persons = if options.exclude_imperativ_2 {
                table.get(&ImperativeForm::First)?
            } else {
                let (ordinal, persons) = pick(table, rng)?;
                labels.push(ordinal.label().to_string());
                persons
            };
            let (person, form) = pick(persons, rng)?;
            labels.push(person.label().to_string());
            Answer::Single(form.clone())
        }
        CategoryTree::Gerund(table) => {
            labels.push(category.label().to_string());
            let (case, form) = pick(table, rng)?;
            labels.push(case.label().to_string());
            Answer::Single(form.clone())
        }
        CategoryTree::Supine(table) => {
            labels.push(category.label().to_string());
            let (label, form) = pick(table, rng)?;
            labels.push(label.clone());
            Answer::Single(form.clone())
        }
        CategoryTree::Gerundive(table) => {
            labels.push(category.label().to_string());
            declined(table, options.ignore_gender_gerundive, &mut labels, rng)?
        }
        CategoryTree::Participles(kinds) => {
            let (kind, table) = pick(kinds, rng)?;
            labels.push(kind.label().to_string());
            declined(table, options.ignore_gender_participles, &mut labels, rng)?
        }
    };

    let text = format!("Was ist {} von {headword}? ", labels.join(" "))
        .replace("Imperativ Imperativ", "Imperativ");
    Some(Question {
        headword: headword.to_string(),
        category,
        text,
        answer,
    })
}

fn declined<R>(
    table: &DeclensionTable,
    ignore_gender: bool,
    labels: &mut Vec<String>,
    rng: &mut R,
) -> Option<Answer>
where
    R: Rng + ?Sized,
{
    let (number, cases) = pick(table, rng)?;
    let (case, forms): (_, &GenderForms) = pick(cases, rng)?;
    labels.extend([number.label().to_string(), case.label().to_string()]);
    if ignore_gender {
        return Some(Answer::Any(forms.to_vec()));
    }
    let gender = *Gender::ALL.choose(rng)?;
    labels.push(gender.label().to_string());
    Some(Answer::Single(forms.get(gender).clone()))
}

/// Uniform entry of a non-empty map.
fn pick<'a, K, V, R>(map: &'a BTreeMap<K, V>, rng: &mut R) -> Option<(&'a K, &'a V)>
where
    R: Rng + ?Sized,
{
    map.iter().choose(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use latin_paradigm::{Case, Person, Voice};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn gerund_only() -> ParadigmStore {
        let mut paradigm = Paradigm::new();
        paradigm
            .insert(
                Category::Gerund,
                CategoryTree::Gerund(BTreeMap::from([
                    (Case::Genitive, Form::attested("amandi")),
                    (Case::Dative, Form::Missing),
                ])),
            )
            .unwrap();
        let mut store = ParadigmStore::new();
        store.insert("amare", paradigm);
        store
    }

    #[test]
    fn answers_compare_loosely() {
        let single = Answer::Single(Form::attested("Amo"));
        assert!(single.accepts("  amo "));
        assert!(!single.accepts("amas"));

        let any = Answer::Any(vec![
            Form::attested("amatus"),
            Form::attested("amata"),
            Form::attested("amatum"),
        ]);
        assert!(any.accepts("AMATA"));
        assert!(!any.has_missing());
    }

    #[test]
    fn missing_forms_are_redrawn() {
        let store = gerund_only();
        let options = QuizOptions {
            weights: WeightSpec::Preset("gerund".into()),
            ..QuizOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let question = draw_question(&store, &options, &mut rng).unwrap();
            assert_eq!(question.text, "Was ist Gerundium Genitiv von amare? ");
            assert_eq!(question.answer, Answer::Single(Form::attested("amandi")));
        }
    }

    #[test]
    fn exhausts_when_every_answer_is_missing() {
        let mut paradigm = Paradigm::new();
        paradigm
            .insert(
                Category::PresentIndicative,
                CategoryTree::Finite(BTreeMap::from([(
                    Voice::Active,
                    BTreeMap::from([(Person::FirstSingular, Form::Missing)]),
                )])),
            )
            .unwrap();
        let mut store = ParadigmStore::new();
        store.insert("esse", paradigm);

        let options = QuizOptions {
            max_attempts: 25,
            ..QuizOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            draw_question(&store, &options, &mut rng),
            Err(SampleError::Exhausted(25))
        );

        let lenient = QuizOptions {
            exclude_missing: false,
            ..options
        };
        let question = draw_question(&store, &lenient, &mut rng).unwrap();
        assert!(question.answer.has_missing());
    }

    #[test]
    fn excluded_headwords_leave_nothing_to_ask() {
        let store = gerund_only();
        let options = QuizOptions {
            excluded_headwords: BTreeSet::from(["amare".to_string()]),
            ..QuizOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            draw_question(&store, &options, &mut rng),
            Err(SampleError::NoHeadword)
        );
    }

    #[test]
    fn bad_weights_surface_as_config_errors() {
        let store = gerund_only();
        let options = QuizOptions {
            weights: WeightSpec::Preset("irgendwas".into()),
            ..QuizOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            draw_question(&store, &options, &mut rng),
            Err(SampleError::Config(ConfigError::UnknownPreset(_)))
        ));
    }
}

use std::collections::BTreeMap;

use latin_paradigm::{
    Case, Category, CategoryTree, Form, GenderForms, ImperativeForm, InfinitiveTime, Number,
    Paradigm, ParticipleKind, ParadigmStore, Person, Voice,
};

fn gendered(m: &str, f: &str, n: &str) -> GenderForms {
    GenderForms {
        masculine: Form::attested(m),
        feminine: Form::attested(f),
        neuter: Form::attested(n),
    }
}

fn sample_paradigm() -> Paradigm {
    let mut paradigm = Paradigm::new();
    paradigm
        .insert(
            Category::PresentIndicative,
            CategoryTree::Finite(BTreeMap::from([
                (
                    Voice::Active,
                    BTreeMap::from([
                        (Person::FirstSingular, Form::attested("amo")),
                        (Person::SecondSingular, Form::attested("amas")),
                    ]),
                ),
                (
                    Voice::Passive,
                    BTreeMap::from([(Person::FirstSingular, Form::attested("amor"))]),
                ),
            ])),
        )
        .unwrap();
    paradigm
        .insert(
            Category::Imperative,
            CategoryTree::Imperative(BTreeMap::from([
                (
                    ImperativeForm::First,
                    BTreeMap::from([(Person::SecondSingular, Form::attested("ama"))]),
                ),
                (
                    ImperativeForm::Second,
                    BTreeMap::from([(Person::ThirdPlural, Form::Missing)]),
                ),
            ])),
        )
        .unwrap();
    paradigm
        .insert(
            Category::Infinitive,
            CategoryTree::Infinitive(BTreeMap::from([(
                Voice::Active,
                BTreeMap::from([(InfinitiveTime::Present, Form::attested("amare"))]),
            )])),
        )
        .unwrap();
    let ppp = BTreeMap::from([(
        Number::Singular,
        BTreeMap::from([(Case::Nominative, gendered("amatus", "amata", "amatum"))]),
    )]);
    paradigm
        .insert(Category::Gerundive, CategoryTree::Gerundive(ppp.clone()))
        .unwrap();
    paradigm
        .insert(
            Category::Participles,
            CategoryTree::Participles(BTreeMap::from([(ParticipleKind::PerfectPassive, ppp)])),
        )
        .unwrap();
    paradigm
        .insert(
            Category::Supine,
            CategoryTree::Supine(BTreeMap::from([
                ("Supin I".to_string(), Form::attested("Supin II")),
                ("amatum".to_string(), Form::attested("amatu")),
            ])),
        )
        .unwrap();
    paradigm
}

#[test]
fn save_then_load_reproduces_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let mut store = ParadigmStore::new();
    store.insert("amare", sample_paradigm());
    store.save(&path).unwrap();

    let loaded = ParadigmStore::load(&path);
    assert_eq!(loaded, store);
    assert_eq!(
        loaded
            .get("amare")
            .and_then(|p| p.lookup("Indikativ Präsens", "Passiv", "1. Person Singular")),
        Some(&Form::attested("amor"))
    );
}

#[test]
fn missing_forms_persist_as_marker() {
    let mut store = ParadigmStore::new();
    store.insert("amare", sample_paradigm());
    let json: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
    assert_eq!(
        json["amare"]["Imperativ"]["Imperativ II"]["3. Person Plural"],
        "existiert nicht"
    );
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParadigmStore::load(dir.path().join("absent.json"));
    assert!(store.is_empty());
}

#[test]
fn corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, b"{\"amare\": {\"Gerundium\": ").unwrap();
    assert!(ParadigmStore::load(&path).is_empty());

    std::fs::write(&path, br#"{"amare": {"Gerundium": {"Lokativ": "x"}}}"#).unwrap();
    assert!(ParadigmStore::load(&path).is_empty());
}

#[test]
fn legacy_file_keeps_options_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        br#"{"data": {"amare": {"Gerundium": {"Genitiv": "amandi"}}}, "options": {"delay": 2}}"#,
    )
    .unwrap();

    let store = ParadigmStore::load(&path);
    assert_eq!(store.len(), 1);
    store.save(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["options"]["delay"], 2);
    assert_eq!(raw["data"]["amare"]["Gerundium"]["Genitiv"], "amandi");
}

#[test]
fn legacy_file_with_active_only_tense_survives_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        r#"{"data": {"amare": {"Gerundium": {"Genitiv": "amandi"}},
                     "esse": {"Indikativ Präsens": {"1. Person Singular": "sum"}},
                     "nolle": {"Imperativ": {"2. Person Singular": "noli"}}},
            "options": {"delay": 1.2}}"#,
    )
    .unwrap();

    let store = ParadigmStore::load(&path);
    assert_eq!(store.len(), 2);
    assert_eq!(
        store
            .get("esse")
            .and_then(|p| p.lookup("Indikativ Präsens", "Aktiv", "1. Person Singular")),
        Some(&Form::attested("sum"))
    );
    assert_eq!(store.options(), Some(&serde_json::json!({"delay": 1.2})));
    store.save(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["options"]["delay"], 1.2);
    assert_eq!(raw["data"]["amare"]["Gerundium"]["Genitiv"], "amandi");
    assert_eq!(
        raw["data"]["esse"]["Indikativ Präsens"]["Aktiv"]["1. Person Singular"],
        "sum"
    );
    assert_eq!(raw["data"]["nolle"]["Imperativ"]["2. Person Singular"], "noli");
}

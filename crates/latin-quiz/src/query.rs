//! Abbreviated lookups such as `amare Ind. Präs. Akt. 1. Sing.`.
//!
//! Periods are treated as spaces. Five tokens read as headword, tense,
//! voice and two person tokens; longer inputs take two tense tokens and
//! give the rest to the person. Each token is expanded through fixed
//! abbreviation tables and the resulting path is looked up exactly.

use latin_paradigm::{Form, ParadigmStore};

/// Canonical `headword / tense / voice / person` path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupPath {
    pub headword: String,
    pub tense: String,
    pub voice: String,
    pub person: String,
}

pub fn parse_query(input: &str) -> Option<LookupPath> {
    let cleaned = input.replace('.', " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let (headword, tense, voice, person) = match tokens.len() {
        5 => (tokens[0], &tokens[1..2], tokens[2], &tokens[3..]),
        n if n > 5 => (tokens[0], &tokens[1..3], tokens[3], &tokens[4..]),
        _ => return None,
    };
    Some(LookupPath {
        headword: headword.to_string(),
        tense: expand(tense, tense_token),
        voice: voice_token(voice).to_string(),
        person: person_phrase(person),
    })
}

/// Resolve a path against the store; any missing level yields `None`.
pub fn lookup<'a>(store: &'a ParadigmStore, path: &LookupPath) -> Option<&'a Form> {
    store
        .get(&path.headword)?
        .lookup(&path.tense, &path.voice, &path.person)
}

pub fn search<'a>(store: &'a ParadigmStore, input: &str) -> Option<&'a Form> {
    lookup(store, &parse_query(input)?)
}

fn expand(tokens: &[&str], table: fn(&str) -> &str) -> String {
    tokens
        .iter()
        .map(|token| table(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn tense_token(token: &str) -> &str {
    match token {
        "Imp" => "Imperfekt",
        "Perf" | "Per" => "Perfekt",
        "Fut" => "Futur",
        "1" => "I",
        "2" => "II",
        "Präs" | "Prä" => "Präsens",
        "Plus" | "Plusquam" | "Plusquamperf" => "Plusquamperfekt",
        "Gerundiv" => "Gerundivum",
        "Ind" => "Indikativ",
        "Konj" | "Kon" => "Konjunktiv",
        "Fut1" | "FutI" | "FuturI" | "Futur1" => "Futur I",
        "Fut2" | "FutII" | "FuturII" | "Futur2" => "Futur II",
        other => other,
    }
}

fn voice_token(token: &str) -> &str {
    match token {
        "Pass" | "Passive" => "Passiv",
        "Akt" | "Aktive" => "Aktiv",
        other => other,
    }
}

fn person_token(token: &str) -> &str {
    match token {
        "Erste" | "1" => "1.",
        "Zweite" | "2" => "2.",
        "Dritte" | "3" => "3.",
        "Pers" | "P" => "Person",
        "Sing" | "S" => "Singular",
        "Plur" | "Plu" | "Pl" => "Plural",
        other => other,
    }
}

/// Expand person tokens, inserting `Person` between a bare ordinal and number.
fn person_phrase(tokens: &[&str]) -> String {
    let expanded: Vec<&str> = tokens.iter().map(|token| person_token(token)).collect();
    match expanded.as_slice() {
        [ordinal @ ("1." | "2." | "3."), number @ ("Singular" | "Plural")] => {
            format!("{ordinal} Person {number}")
        }
        _ => expanded.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_query_takes_two_tense_tokens() {
        assert_eq!(
            parse_query("amare Ind. Präs. Akt. 1. Sing."),
            Some(LookupPath {
                headword: "amare".into(),
                tense: "Indikativ Präsens".into(),
                voice: "Aktiv".into(),
                person: "1. Person Singular".into(),
            })
        );
        assert_eq!(
            parse_query("amare Konj Fut2 Pass Dritte P Pl").map(|p| (p.tense, p.person)),
            Some(("Konjunktiv Futur II".into(), "3. Person Plural".into()))
        );
    }

    #[test]
    fn five_tokens_take_one_tense_token() {
        let path = parse_query("amare Gerundiv Akt 2 S").unwrap();
        assert_eq!(path.tense, "Gerundivum");
        assert_eq!(path.voice, "Aktiv");
        assert_eq!(path.person, "2. Person Singular");
    }

    #[test]
    fn short_queries_yield_nothing() {
        assert_eq!(parse_query("amare Ind Präs Akt"), None);
        assert_eq!(parse_query(""), None);
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let path = parse_query("amare Indikativ Perfekt Passiv 1. Person Plural").unwrap();
        assert_eq!(path.tense, "Indikativ Perfekt");
        assert_eq!(path.person, "1. Person Plural");
    }
}

//! Message text for talking actions and reactions.

use mudbot_core::{DeterministicRng, Spread};

use crate::config::TextConfig;
use crate::world::Character;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum",
];

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// Posed rather than spoken
    pub pose: bool,
}

/// Lorem ipsum with a word count in `[min_words, max_words)` drawn with `spread`.
///
/// The first word is capitalised and the text ends with a period.
pub fn generate(
    rng: &mut impl DeterministicRng,
    min_words: u64,
    max_words: u64,
    spread: Spread,
) -> String {
    let count = spread.sample(rng, min_words.max(1), max_words).max(1);

    let mut text = String::new();
    for i in 0..count {
        let word = WORDS[rng.next_index(WORDS.len())];
        if i == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                text.extend(first.to_uppercase());
                text.push_str(chars.as_str());
            }
        } else {
            text.push(' ');
            text.push_str(word);
        }
    }
    text.push('.');
    text
}

/// Pick a configured phrase, or generate one. A leading ':' marks a pose and is stripped.
pub fn compose(rng: &mut impl DeterministicRng, config: &TextConfig) -> Message {
    let raw = match config.phrases.as_deref() {
        Some(phrases) if !phrases.is_empty() => phrases[rng.next_index(phrases.len())].clone(),
        _ => generate(rng, config.word_min, config.word_max, config.spread),
    };

    match raw.strip_prefix(':') {
        Some(rest) => Message {
            text: rest.to_string(),
            pose: true,
        },
        None => Message {
            text: raw,
            pose: false,
        },
    }
}

/// Fill `{name}`, `{surname}`, `{fullname}` and `{id}` from a character.
///
/// Unknown tags become `???`. An unclosed brace is kept as it is.
pub fn replace_tags(msg: &str, character: &Character) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut rest = msg;
    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        match &rest[open + 1..open + len] {
            "name" => out.push_str(&character.name),
            "surname" => out.push_str(&character.surname),
            "fullname" => out.push_str(&character.full_name()),
            "id" => out.push_str(&character.id),
            _ => out.push_str("???"),
        }
        rest = &rest[open + len + 1..];
    }
    out.push_str(rest);
    out
}

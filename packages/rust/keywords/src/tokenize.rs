//! Word and sentence tokenizers for abstract text.

use std::sync::LazyLock;

use regex::Regex;

/// Contraction and possessive endings split off a word, Treebank style.
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "al", "fig", "figs", "eq", "eqs", "ref", "refs", "vs", "cf", "resp", "approx",
    "sec",
];

/// Sentence terminator run, optional closing quotes/brackets, then whitespace or end.
static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'\)\]\u{201D}\u{2019}]*(\s+|$)"#).expect("sentence end regex")
});

/// Split `text` into word tokens.
///
/// Whitespace separates chunks. Leading and trailing ASCII punctuation is
/// peeled into its own token, as are contraction endings. Punctuation inside a
/// chunk (`quantum-dot`, `2.5`) keeps it whole.
pub fn word_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();

    for chunk in text.split_whitespace() {
        let start = chunk
            .find(|c: char| !c.is_ascii_punctuation())
            .unwrap_or(chunk.len());
        let (lead, rest) = chunk.split_at(start);
        let end = rest
            .char_indices()
            .rev()
            .find(|(_, c)| !c.is_ascii_punctuation())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let (core, trail) = rest.split_at(end);

        if !lead.is_empty() {
            tokens.push(lead);
        }
        if !core.is_empty() {
            let (word, clitic) = split_clitic(core);
            tokens.push(word);
            if let Some(clitic) = clitic {
                tokens.push(clitic);
            }
        }
        if !trail.is_empty() {
            tokens.push(trail);
        }
    }

    tokens
}

fn split_clitic(word: &str) -> (&str, Option<&str>) {
    let lower = word.to_ascii_lowercase();
    for clitic in CLITICS {
        if lower.len() > clitic.len() && lower.ends_with(clitic) {
            let at = word.len() - clitic.len();
            if word.is_char_boundary(at) {
                return (&word[..at], Some(&word[at..]));
            }
        }
    }
    (word, None)
}

/// Split `text` into trimmed, non-empty sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or the end of
/// the text. Periods after common abbreviations or single-letter initials
/// do not end a sentence.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END_RE.find_iter(text) {
        let terminator = &text[m.start()..m.end()];
        if terminator.starts_with('.') && ends_with_abbreviation(&text[start..m.start()]) {
            continue;
        }

        let end = m.start() + terminator.trim_end().len();
        push_sentence(&mut out, &text[start..end]);
        start = m.end();
    }
    push_sentence(&mut out, &text[start..]);

    out
}

fn push_sentence(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn ends_with_abbreviation(before: &str) -> bool {
    let Some(last) = before.split_whitespace().next_back() else {
        return false;
    };
    let word = last
        .trim_start_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();

    let mut chars = word.chars();
    let single_letter = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic());

    single_letter || ABBREVIATIONS.contains(&word.as_str())
}

//! Compound (noun phrase) extraction
//!
//! Cascaded shallow grammar over chunk categories. Rules are applied in
//! priority order; each rule scans left to right over tokens no earlier rule
//! has chunked, taking the longest match at the leftmost position:
//!
//! 1. `ADJ* NOUN (CONJ NOUN)+`
//! 2. `NOUN (ADP NOUN)+`
//! 3. `ADJ* NOUN+`
//! 4. `NOUN+`
//!
//! Only chunks longer than one token are reported as compounds.

use crate::tags::{chunk_category, ChunkCategory};
use crate::types::Compound;

use ChunkCategory::{Adjective, Adposition, Conjunction, Noun};

/// Length of the run of `cat` starting at `from`
fn run(cats: &[ChunkCategory], from: usize, cat: ChunkCategory) -> usize {
    cats[from.min(cats.len())..]
        .iter()
        .take_while(|c| **c == cat)
        .count()
}

/// Number of consecutive `(a b)` pairs starting at `from`
fn pairs(cats: &[ChunkCategory], from: usize, a: ChunkCategory, b: ChunkCategory) -> usize {
    let mut count = 0;
    let mut i = from;
    while i + 1 < cats.len() && cats[i] == a && cats[i + 1] == b {
        count += 1;
        i += 2;
    }
    count
}

/// `ADJ* NOUN (CONJ NOUN)+`
fn coordinated_nouns(cats: &[ChunkCategory]) -> Option<usize> {
    let adjectives = run(cats, 0, Adjective);
    if cats.get(adjectives) != Some(&Noun) {
        return None;
    }
    let p = pairs(cats, adjectives + 1, Conjunction, Noun);
    (p > 0).then_some(adjectives + 1 + 2 * p)
}

/// `NOUN (ADP NOUN)+`
fn prepositional_nouns(cats: &[ChunkCategory]) -> Option<usize> {
    if cats.first() != Some(&Noun) {
        return None;
    }
    let p = pairs(cats, 1, Adposition, Noun);
    (p > 0).then_some(1 + 2 * p)
}

/// `ADJ* NOUN+`
fn modified_nouns(cats: &[ChunkCategory]) -> Option<usize> {
    let adjectives = run(cats, 0, Adjective);
    let nouns = run(cats, adjectives, Noun);
    (nouns > 0).then_some(adjectives + nouns)
}

/// `NOUN+`
fn bare_nouns(cats: &[ChunkCategory]) -> Option<usize> {
    let nouns = run(cats, 0, Noun);
    (nouns > 0).then_some(nouns)
}

type Rule = fn(&[ChunkCategory]) -> Option<usize>;

const RULES: [Rule; 4] = [coordinated_nouns, prepositional_nouns, modified_nouns, bare_nouns];

/// Extract compounds from a POS-tagged token sequence
///
/// `tokens` and `pos` are parallel; extra entries in either are ignored.
pub fn extract_compounds(tokens: &[String], pos: &[String]) -> Vec<Compound> {
    let n = tokens.len().min(pos.len());
    let cats: Vec<ChunkCategory> = pos[..n].iter().map(|t| chunk_category(t)).collect();
    let mut chunked = vec![false; n];
    // (start, length), 0-based
    let mut chunks: Vec<(usize, usize)> = Vec::new();

    for rule in RULES {
        let mut i = 0;
        while i < n {
            if chunked[i] {
                i += 1;
                continue;
            }
            // Matches may not extend into an existing chunk
            let end = (i..n).find(|&j| chunked[j]).unwrap_or(n);
            match rule(&cats[i..end]) {
                Some(len) => {
                    chunked[i..i + len].iter_mut().for_each(|c| *c = true);
                    chunks.push((i, len));
                    i += len;
                }
                None => i += 1,
            }
        }
    }

    chunks.sort_unstable();

    chunks
        .into_iter()
        .filter(|(_, len)| *len > 1)
        .map(|(start, len)| Compound {
            start: start + 1,
            text: tokens[start..start + len].join(" "),
            size: len,
        })
        .collect()
}

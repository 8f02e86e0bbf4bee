//! Text frontend: symbol encoding and piece splitting.

use std::collections::HashMap;

/// Sentence terminators that end a piece, ASCII and CJK.
const TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？', '…'];

/// Character-to-id map over the config's symbol inventory.
///
/// Only single-character symbols are addressable from raw text; the first
/// occurrence wins when a character repeats in the list.
pub fn build_symbol_map(symbols: &[String]) -> HashMap<char, i64> {
    let mut map = HashMap::new();
    for (i, symbol) in symbols.iter().enumerate() {
        let mut chars = symbol.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            map.entry(ch).or_insert(i as i64);
        }
    }
    map
}

/// Encode text as symbol ids, silently dropping unknown characters.
pub fn encode(text: &str, symbol_map: &HashMap<char, i64>) -> Vec<i64> {
    text.chars()
        .filter_map(|ch| symbol_map.get(&ch).copied())
        .collect()
}

/// Split a sentence into synthesis-sized pieces.
///
/// Pieces end at sentence terminators, which stay attached to their piece.
/// Anything still longer than `max_chars` is split at whitespace, and an
/// unbroken run (CJK text has no spaces) is cut at the character budget.
pub fn split_pieces(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if TERMINATORS.contains(&ch) {
            flush_piece(&mut pieces, &mut current, max_chars);
        }
    }
    flush_piece(&mut pieces, &mut current, max_chars);
    pieces
}

fn flush_piece(pieces: &mut Vec<String>, current: &mut String, max_chars: usize) {
    let piece = current.trim();
    if !piece.is_empty() {
        if piece.chars().count() <= max_chars {
            pieces.push(piece.to_string());
        } else {
            pieces.extend(split_long(piece, max_chars));
        }
    }
    current.clear();
}

fn split_long(piece: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in piece.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                out.push(chunk.iter().collect());
            }
            continue;
        }
        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

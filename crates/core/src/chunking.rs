use crate::error::IngestError;
use crate::models::{Chunk, ChunkingOptions};

/// Collapse whitespace runs, replace em-dash style characters with a plain
/// hyphen, drop literal `Page <N>` artifacts, and trim. Pure and
/// deterministic; this is the only text cleanup the pipeline performs.
pub fn normalize_text(text: &str) -> String {
    let dashed = text.replace(['\u{2013}', '\u{2014}', '\u{2015}'], "-");
    let tokens: Vec<&str> = dashed.split_whitespace().collect();

    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        // "Page 42" including footer forms glued to punctuation ("Page 42.",
        // "Page 42,"): drop the marker and its digits, keep any remainder.
        if tokens[index] == "Page" {
            if let Some(next) = tokens.get(index + 1) {
                let digits = next.len() - next.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                if digits > 0 {
                    let rest = &next[digits..];
                    if !rest.is_empty() {
                        kept.push(rest);
                    }
                    index += 2;
                    continue;
                }
            }
        }
        kept.push(tokens[index]);
        index += 1;
    }

    kept.join(" ")
}

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Separators are tried in priority order; the coarsest separator present in
/// the text wins, and pieces that are still too large recurse on the finer
/// separators. Pieces are then merged greedily into windows, with the tail
/// of each window (up to `overlap` characters of whole pieces) carried into
/// the next one.
pub fn split_text(text: &str, options: &ChunkingOptions) -> Result<Vec<String>, IngestError> {
    if options.chunk_size == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if options.overlap >= options.chunk_size {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {} must be smaller than chunk_size {}",
            options.overlap, options.chunk_size
        )));
    }

    let pieces = split_recursive(text, &options.separators, options.chunk_size, options.overlap);
    Ok(merge_pieces(pieces, options.chunk_size, options.overlap))
}

/// Chunk normalized text for one source, assigning sequential 1-based ids
/// starting after `cursor`. Returns the chunks and the advanced cursor so a
/// multi-row source (CSV) can keep one id sequence across rows.
pub fn build_chunks(
    text: &str,
    source: &str,
    options: &ChunkingOptions,
    cursor: u64,
) -> Result<(Vec<Chunk>, u64), IngestError> {
    let mut chunks = Vec::new();
    let mut next_id = cursor;

    for piece in split_text(text, options)? {
        let content = piece.trim().to_string();
        if content.is_empty() {
            continue;
        }
        next_id += 1;
        chunks.push(Chunk {
            source: source.to_string(),
            chunk_id: next_id,
            content,
        });
    }

    Ok((chunks, next_id))
}

/// One entry of the chunking rule table: a predicate on the source file
/// name and the options to use when it matches.
pub struct ProfileRule {
    pub matches: fn(&str) -> bool,
    pub options: ChunkingOptions,
}

/// Ordered rule table mapping source file names to chunking profiles. The
/// first matching rule wins; the final rule is a catch-all. Detection looks
/// at the file name only, never at document content.
pub fn profile_rules() -> Vec<ProfileRule> {
    vec![
        ProfileRule {
            matches: |name| name.to_lowercase().contains("constitution"),
            options: ChunkingOptions::structural(),
        },
        ProfileRule {
            matches: |_| true,
            options: ChunkingOptions::prose(),
        },
    ]
}

pub fn options_for_source(file_name: &str) -> ChunkingOptions {
    profile_rules()
        .into_iter()
        .find(|rule| (rule.matches)(file_name))
        .map(|rule| rule.options)
        .unwrap_or_default()
}

fn split_recursive(
    text: &str,
    separators: &[String],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let found = separators
        .iter()
        .enumerate()
        .find(|(_, separator)| text.contains(separator.as_str()));

    let (position, separator) = match found {
        Some(hit) => hit,
        None => return hard_split(text, chunk_size, overlap),
    };

    let mut pieces = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if char_len(&piece) <= chunk_size {
            pieces.push(piece);
        } else {
            pieces.extend(split_recursive(
                &piece,
                &separators[position + 1..],
                chunk_size,
                overlap,
            ));
        }
    }
    pieces
}

/// Split on `separator` without losing it: structural markers (alphabetic
/// separators such as "Article") stay attached to the piece they open,
/// punctuation and whitespace separators stay attached to the piece they
/// close. Concatenating the pieces reproduces the input exactly.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    let attach_to_next = separator
        .chars()
        .next()
        .is_some_and(|first| first.is_alphabetic());

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        let boundary = if attach_to_next {
            index
        } else {
            index + separator.len()
        };
        if boundary > start {
            pieces.push(text[start..boundary].to_string());
            start = boundary;
        }
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}

/// Last-resort split when no separator applies: fixed character windows
/// that share `overlap` characters with the previous window.
fn hard_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += chunk_size - overlap;
    }
    pieces
}

fn merge_pieces(pieces: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    let mut window_len = 0;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if window_len + piece_len > chunk_size && !window.is_empty() {
            chunks.push(window.concat());

            while window_len > overlap
                || (window_len + piece_len > chunk_size && !window.is_empty())
            {
                let removed = window.remove(0);
                window_len -= char_len(&removed);
                if window.is_empty() {
                    break;
                }
            }
        }

        window_len += piece_len;
        window.push(piece);
    }

    if !window.is_empty() {
        chunks.push(window.concat());
    }

    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

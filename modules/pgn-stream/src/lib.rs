//! Line-oriented PGN handling for TV snapshot batches.
//!
//! The upstream endpoint returns several games per response: a run of
//! `[Tag "Value"]` header lines followed by a single rendered move line per
//! game, with stray blank lines in between. This crate splits that stream
//! into per-game blocks and decodes the lines; it is not a general PGN
//! parser (no comments, variations, or multi-line movetext).

use std::collections::HashMap;

use tracing::debug;

/// One decoded line from a PGN stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgnLine {
    /// A `[Tag "Value"]` header. Tag names are lowercased.
    Tag { name: String, value: String },
    /// A movetext fragment, passed through verbatim.
    Moves(String),
}

/// Classify one non-blank line. Returns `None` for a header line that cannot
/// be split into tag and value; callers drop that field and keep going.
pub fn decode_line(line: &str) -> Option<PgnLine> {
    let line = line.trim();
    if let Some(inner) = line.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let (name, value) = inner.split_once(' ')?;
        Some(PgnLine::Tag {
            name: name.to_ascii_lowercase(),
            value: value.trim().trim_matches('"').to_string(),
        })
    } else {
        Some(PgnLine::Moves(line.to_string()))
    }
}

/// The block boundary heuristic: in the TV snapshot format the first rendered
/// move line ends a game's header section. Kept in one place so a format
/// change upstream is a one-line fix here.
pub fn is_first_move_line(line: &str) -> bool {
    line.starts_with("1. ")
}

/// Groups raw stream lines into per-game blocks.
///
/// Blank lines are skipped, never treated as boundaries; the upstream format
/// does not emit them reliably between games. A buffer that never reaches a
/// move line by the end of a batch is an incomplete snapshot entry and is
/// dropped by [`BlockAssembler::finish`].
#[derive(Debug, Default)]
pub struct BlockAssembler {
    buf: Vec<String>,
}

impl BlockAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Returns a complete block (headers plus the first
    /// move line) when the boundary is reached.
    pub fn push(&mut self, line: &str) -> Option<Vec<String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.buf.push(line.to_string());
        if is_first_move_line(line) {
            return Some(std::mem::take(&mut self.buf));
        }
        None
    }

    /// Discard any trailing partial block at the end of a batch.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            debug!(lines = self.buf.len(), "discarding partial block at end of batch");
            self.buf.clear();
        }
    }
}

/// Split one whole response body into game blocks.
pub fn split_batch(body: &str) -> Vec<Vec<String>> {
    let mut asm = BlockAssembler::new();
    let mut blocks = Vec::new();
    for line in body.lines() {
        if let Some(block) = asm.push(line) {
            blocks.push(block);
        }
    }
    asm.finish();
    blocks
}

/// One game's decoded headers and movetext.
#[derive(Debug, Clone, Default)]
pub struct PgnGame {
    headers: HashMap<String, String>,
    moves: String,
}

impl PgnGame {
    /// Decode a completed block. Repeated tags overwrite (last one wins);
    /// malformed header lines are dropped; movetext fragments are joined
    /// with single spaces.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = HashMap::new();
        let mut moves: Vec<String> = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            match decode_line(line) {
                Some(PgnLine::Tag { name, value }) => {
                    headers.insert(name, value);
                }
                Some(PgnLine::Moves(text)) => moves.push(text),
                None => debug!(line, "dropping malformed header line"),
            }
        }
        PgnGame { headers, moves: moves.join(" ") }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn moves(&self) -> &str {
        &self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_header_line() {
        let got = decode_line(r#"[Event "Rated blitz game"]"#).unwrap();
        assert_eq!(
            got,
            PgnLine::Tag { name: "event".into(), value: "Rated blitz game".into() }
        );
    }

    #[test]
    fn decode_lowercases_tag_names() {
        match decode_line(r#"[WhiteElo "2100"]"#).unwrap() {
            PgnLine::Tag { name, value } => {
                assert_eq!(name, "whiteelo");
                assert_eq!(value, "2100");
            }
            other => panic!("expected tag, got {other:?}"),
        }
    }

    #[test]
    fn decode_drops_header_without_separator() {
        assert_eq!(decode_line("[Malformed]"), None);
    }

    #[test]
    fn decode_passes_moves_through() {
        let got = decode_line("1. e4 e5 2. Nf3").unwrap();
        assert_eq!(got, PgnLine::Moves("1. e4 e5 2. Nf3".into()));
    }

    #[test]
    fn assembler_emits_two_blocks_at_move_lines() {
        let lines = [
            r#"[Event "E"]"#,
            r#"[Site "https://x/abc123"]"#,
            "1. e4 e5",
            r#"[Event "E2"]"#,
            r#"[Site "https://x/def456"]"#,
            "1. d4 d5",
        ];
        let mut asm = BlockAssembler::new();
        let mut blocks = Vec::new();
        for line in lines {
            if let Some(b) = asm.push(line) {
                blocks.push(b);
            }
        }
        asm.finish();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].last().unwrap(), "1. e4 e5");
        assert_eq!(blocks[1].last().unwrap(), "1. d4 d5");

        let first = PgnGame::from_lines(&blocks[0]);
        let second = PgnGame::from_lines(&blocks[1]);
        assert_eq!(first.header("site"), Some("https://x/abc123"));
        assert_eq!(second.header("site"), Some("https://x/def456"));
    }

    #[test]
    fn blank_lines_never_split_or_merge_blocks() {
        // Adversarial blank-line placement: before, between, and inside
        // header runs. Block count and contents must not change.
        let body = "\n[Event \"A\"]\n\n[Site \"https://x/aaa\"]\n\n\n1. e4 e5\n\n\n[Event \"B\"]\n[Site \"https://x/bbb\"]\n\n1. c4 c5\n";
        let blocks = split_batch(body);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], vec![
            r#"[Event "A"]"#.to_string(),
            r#"[Site "https://x/aaa"]"#.to_string(),
            "1. e4 e5".to_string(),
        ]);
        assert_eq!(blocks[1].last().unwrap(), "1. c4 c5");
    }

    #[test]
    fn trailing_partial_block_is_discarded() {
        let body = "[Event \"A\"]\n[Site \"https://x/aaa\"]\n1. e4 e5\n[Event \"B\"]\n[Site \"https://x/bbb\"]\n";
        let blocks = split_batch(body);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn repeated_tag_last_one_wins() {
        let game = PgnGame::from_lines([
            r#"[Result "*"]"#,
            r#"[Result "1-0"]"#,
            "1. e4 e5",
        ]);
        assert_eq!(game.header("result"), Some("1-0"));
    }

    #[test]
    fn move_fragments_join_with_single_spaces() {
        let game = PgnGame::from_lines(["1. e4 e5", "2. Nf3 Nc6"]);
        assert_eq!(game.moves(), "1. e4 e5 2. Nf3 Nc6");
    }

    #[test]
    fn missing_header_is_none() {
        let game = PgnGame::from_lines([r#"[Event "E"]"#, "1. e4"]);
        assert_eq!(game.header("site"), None);
    }
}

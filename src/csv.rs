//! Quote-aware CSV tokenizer for the sheet export.
//!
//! The export is not always well-formed (hand-edited cells, mixed line endings,
//! an unterminated quote at the end), so this is a small tolerant state machine
//! instead of a strict reader: it never fails, it only produces rows.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Unquoted,
    Quoted,
}

/// split `text` into rows of fields
///
/// - `,` separates fields and `\n`, `\r\n` or a bare `\r` end a row, unless quoted
/// - `""` inside a quoted section is a literal quote
/// - rows where every field is blank are dropped
/// - end of input closes the current field and row, even inside quotes
pub fn tokenize(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut state = State::Unquoted;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (state, c) {
            (State::Quoted, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (State::Quoted, '"') => state = State::Unquoted,
            (State::Unquoted, '"') => state = State::Quoted,
            (State::Quoted, _) => field.push(c),
            (State::Unquoted, ',') => row.push(std::mem::take(&mut field)),
            (State::Unquoted, '\n' | '\r') => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            (State::Unquoted, _) => field.push(c),
        }
    }

    row.push(field);
    rows.push(row);

    rows.retain(|r| r.iter().any(|cell| !cell.trim().is_empty()));
    rows
}

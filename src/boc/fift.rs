use super::Error;
use crate::cell::{Cell, CellBuilder, MAX_REF_COUNT};
use crate::util::Bitstring;

/// Parses an indented `x{HEX}` dump.
///
/// Every line is a cell. Children follow their parent with one more space
/// of indentation, roots have no indentation.
pub fn parse(s: &str) -> Result<Vec<Cell>, Error> {
    let mut lines = Vec::new();
    for line in s.lines() {
        if line.trim().is_empty() {
            continue;
        }
        lines.push(ok!(parse_line(line)));
    }

    if lines.is_empty() {
        return Err(Error::InvalidFift);
    }

    let mut roots = Vec::new();
    let mut pos = 0;
    while pos < lines.len() {
        if lines[pos].indent != 0 {
            return Err(Error::InvalidFift);
        }
        roots.push(ok!(build_node(&lines, &mut pos)));
    }
    Ok(roots)
}

struct Line<'a> {
    indent: usize,
    hex: &'a str,
}

fn parse_line(line: &str) -> Result<Line<'_>, Error> {
    let content = line.trim_start_matches(' ');
    let indent = line.len() - content.len();

    let hex = content
        .trim_end()
        .strip_prefix("x{")
        .and_then(|s| s.strip_suffix('}'));

    match hex {
        Some(hex) => Ok(Line { indent, hex }),
        None => Err(Error::InvalidFift),
    }
}

fn build_node(lines: &[Line<'_>], pos: &mut usize) -> Result<Cell, Error> {
    let line = &lines[*pos];
    *pos += 1;

    let mut builder = CellBuilder::new();
    let (data, bit_len) = match Bitstring::from_hex_str(line.hex) {
        Ok(parsed) => parsed,
        Err(_) => return Err(Error::InvalidFift),
    };
    if builder.store_raw(&data, bit_len).is_err() {
        return Err(Error::InvalidFift);
    }

    let mut children = 0;
    while let Some(next) = lines.get(*pos) {
        if next.indent <= line.indent {
            break;
        }
        if next.indent != line.indent + 1 || children == MAX_REF_COUNT {
            return Err(Error::InvalidFift);
        }

        let child = ok!(build_node(lines, pos));
        if builder.store_reference(child).is_err() {
            return Err(Error::InvalidFift);
        }
        children += 1;
    }

    match builder.build() {
        Ok(cell) => Ok(cell),
        Err(e) => Err(Error::InvalidCell(e)),
    }
}

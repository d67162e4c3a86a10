use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Renders `bytes` as a hex dump whose offsets start at `offset`.
///
/// Each line is the 8-digit uppercase offset, a colon, sixteen `XX ` cells
/// (blank cells pad a short last line), a space, and an ASCII gutter where
/// bytes outside 0x20..=0x7E show as `.`.
pub fn hex_dump(bytes: &[u8], offset: u64) -> String {
    let lines = (bytes.len() + BYTES_PER_LINE - 1) / BYTES_PER_LINE;
    let mut out = String::with_capacity(lines * (10 + BYTES_PER_LINE * 4 + 2));
    for (i, line) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let line_offset = offset + (i * BYTES_PER_LINE) as u64;
        // Writing to a String never fails.
        let _ = write!(out, "{line_offset:08X}: ");
        for j in 0..BYTES_PER_LINE {
            match line.get(j) {
                Some(b) => {
                    let _ = write!(out, "{b:02X} ");
                }
                None => out.push_str("   "),
            }
        }
        out.push(' ');
        out.extend(line.iter().map(|&b| gutter_char(b)));
        out.push('\n');
    }
    out
}

/// Returns true for printable ASCII, 0x20..=0x7E.
pub(crate) fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

fn gutter_char(b: u8) -> char {
    if is_printable(b) {
        b as char
    } else {
        '.'
    }
}

//! Request path canonicalisation.
//!
//! [`simplify`] removes `.` and `..` components and repeated slashes from an
//! attacker-controlled path so the result can be appended to a document root
//! without escaping it. It never fails: empty or malformed input still yields
//! a (possibly empty) path.

/// Longest input considered, in bytes. Anything beyond is cut off before
/// simplification.
pub const MAX_PATH_LEN: usize = 4096;

/// Canonicalises a request path.
///
/// Works left to right over `/`-separated segments:
///
/// - leading spaces are skipped, then one leading `.` or `..` segment is dropped;
/// - empty segments (`//`) and `.` segments collapse;
/// - a `..` segment removes itself and the segment before it, stopping at the
///   start of the output;
/// - a trailing slash is kept when the path ended on a collapsed segment.
///
/// ```
/// # use portal::http::path::simplify;
/// assert_eq!(simplify("//a//b/./c/"), "/a/b/c/");
/// assert_eq!(simplify("/a/b/../../../etc/passwd"), "/etc/passwd");
/// assert_eq!(simplify(""), "");
/// ```
pub fn simplify(raw: &str) -> String {
    let mut input = truncate(raw, MAX_PATH_LEN).as_bytes();

    while let [b' ', rest @ ..] = input {
        input = rest;
    }
    match input {
        [b'.'] | [b'.', b'/', ..] => input = &input[1..],
        [b'.', b'.'] | [b'.', b'.', b'/', ..] => input = &input[2..],
        _ => {}
    }

    // Output never outgrows the input, so a buffer of the same size with a
    // rewindable write cursor is enough.
    let mut buf = vec![0u8; input.len()];
    let mut out = 0;
    let mut segment = 0;
    let mut pre1 = 0u8;

    for (i, &byte) in input.iter().enumerate() {
        let pre2 = std::mem::replace(&mut pre1, byte);
        buf[out] = byte;
        out += 1;

        let next = input.get(i + 1).copied();
        if !matches!(next, None | Some(b'/')) {
            continue;
        }
        let at_end = next.is_none();
        let seg_len = out - segment;

        if seg_len == 3 && pre2 == b'.' && pre1 == b'.' && buf[segment] == b'/' {
            // "/.." drops itself and the component before it
            out = segment;
            if out > 0 {
                out -= 1;
                while out > 0 && buf[out] != b'/' {
                    out -= 1;
                }
            }
            if at_end {
                // keep a trailing slash, even where a relative first
                // component was consumed
                buf[out] = b'/';
                out += 1;
            }
        } else if seg_len == 1 || (pre2 == b'/' && pre1 == b'.') {
            // "//" or "/."
            out = segment;
            if at_end {
                out += 1;
            }
        }

        segment = out;
    }

    buf.truncate(out);
    // Segments are cut at ASCII `/`, so multi-byte characters stay whole
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Cuts `raw` to at most `max` bytes on a character boundary.
fn truncate(raw: &str, max: usize) -> &str {
    if raw.len() <= max {
        return raw;
    }
    let mut end = max;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

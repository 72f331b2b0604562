//! Text normalization for extracted document streams.
//!
//! Extraction output is noisy: PDF page breaks leave runs of blank lines,
//! and page-number artifacts survive as digit-only lines. Every extracted
//! stream passes through [`normalize`] before chunking so that chunk
//! boundaries and content ids are computed over stable text.

/// Collapse extraction noise into a canonical form.
///
/// - strips leading/trailing whitespace from every line
/// - drops blank lines (this also collapses runs of newlines)
/// - drops lines consisting solely of digits and whitespace
///   (page-number artifacts)
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_page_artifact(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A line made up entirely of digits and whitespace, e.g. "12" or "3 4".
fn is_page_artifact(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_runs() {
        let input = "alpha\n\n\n\nbeta\n\ngamma";
        assert_eq!(normalize(input), "alpha\nbeta\ngamma");
    }

    #[test]
    fn strips_line_whitespace() {
        let input = "  alpha  \n\tbeta\t\n gamma";
        assert_eq!(normalize(input), "alpha\nbeta\ngamma");
    }

    #[test]
    fn drops_page_number_lines() {
        let input = "Chapter one\n12\nSome text\n 3 4 \nMore text";
        assert_eq!(normalize(input), "Chapter one\nSome text\nMore text");
    }

    #[test]
    fn keeps_lines_mixing_digits_and_words() {
        let input = "Revision 12\n12";
        assert_eq!(normalize(input), "Revision 12");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\n\n\n"), "");
        assert_eq!(normalize("   \n 42 \n  "), "");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "alpha\n\n\nbeta",
            "  x  \n12\n  y  ",
            "",
            "one line",
            "a\nb\nc",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }
}

use raffle_core::Participant;

/// One participant per non-blank line, in source order. Duplicates are kept.
pub fn parse_text(input: &str) -> Vec<Participant> {
    input.lines().filter_map(Participant::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(input: &str) -> Vec<String> {
        parse_text(input).into_iter().map(|p| p.into_name()).collect()
    }

    #[test]
    fn test_one_name_per_line() {
        assert_eq!(names("Ann\nBob\nCid"), vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let input = "  Ann  \n\n   \nBob\r\n\tCid\t\n";
        assert_eq!(names(input), vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_duplicates_kept() {
        assert_eq!(names("Ann\nAnn"), vec!["Ann", "Ann"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_text("").is_empty());
        assert!(parse_text(" \n \n").is_empty());
    }
}

//! Heuristic CSV name extraction.
//!
//! Rules per data row, first match wins:
//! 1. a single field is the name as-is;
//! 2. if the first two fields both look like names they are joined as
//!    `"field0 field1"`, whatever their semantic order;
//! 3. otherwise the first field that looks like a name;
//! 4. otherwise the row yields nothing.

use raffle_core::Participant;
use tracing::debug;

use crate::ImportFeedback;

/// Header rows are recognised by any of these in the lowercased first line.
const HEADER_MARKERS: [&str; 3] = ["name", "first", "last"];

/// Result of scanning CSV content.
#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    pub names: Vec<Participant>,
    /// Non-empty data rows scanned, header excluded.
    pub rows: usize,
    pub header_skipped: bool,
}

impl CsvImport {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn feedback(&self) -> ImportFeedback {
        if self.names.is_empty() {
            ImportFeedback::no_valid_names()
        } else {
            ImportFeedback::imported(self.names.len())
        }
    }
}

/// Extract participant names from CSV text.
pub fn parse_csv(content: &str) -> CsvImport {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty()).peekable();

    let header_skipped = lines.peek().is_some_and(|first| looks_like_header(first));
    if header_skipped {
        lines.next();
    }

    let mut import = CsvImport {
        header_skipped,
        ..Default::default()
    };

    for line in lines {
        import.rows += 1;
        let fields: Vec<String> = line.split(',').map(clean_field).collect();
        match extract_name(&fields).and_then(|n| Participant::new(&n)) {
            Some(name) => import.names.push(name),
            None => debug!(row = import.rows, "CSV row has no usable name"),
        }
    }

    debug!(
        rows = import.rows,
        names = import.names.len(),
        header_skipped,
        "Parsed CSV"
    );
    import
}

fn looks_like_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    HEADER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Trim, then drop one leading and one trailing double quote.
fn clean_field(raw: &str) -> String {
    let field = raw.trim();
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);
    field.to_string()
}

/// ASCII letters, whitespace, apostrophes and hyphens only, at least one char.
fn is_name_like(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'' || c == '-')
}

fn extract_name(fields: &[String]) -> Option<String> {
    match fields {
        [only] => Some(only.clone()),
        [first, second, ..] if is_name_like(first) && is_name_like(second) => {
            Some(format!("{first} {second}"))
        }
        _ => fields.iter().find(|f| is_name_like(f)).cloned(),
    }
}

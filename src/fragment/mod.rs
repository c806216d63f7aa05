use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("malformed fragment: {reason}")]
    Malformed { reason: String },
}

/// One table row lifted out of a server fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    pub cells: Vec<String>,
    pub raw: String,
}

impl Row {
    /// Cell text joined for indexing/filtering.
    pub fn text(&self) -> String {
        self.cells.join(" ")
    }
}

/// Parses a `/load/<cat>` or `/unload/<cat>` response body into rows.
///
/// The wire contract is raw HTML table rows. A whitespace-only body is the
/// unload placeholder and yields no rows. Unbalanced row markup, or a
/// non-empty body with no row markup at all, is rejected as malformed rather
/// than injected blindly.
pub fn parse_rows(body: &str) -> Result<Vec<Row>, FragmentError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let opens = Regex::new(r"(?i)<tr[\s>]").unwrap().find_iter(body).count();
    let closes = Regex::new(r"(?i)</tr>").unwrap().find_iter(body).count();
    if opens != closes {
        return Err(FragmentError::Malformed {
            reason: format!("unbalanced row markup ({opens} open, {closes} close)"),
        });
    }
    if opens == 0 {
        return Err(FragmentError::Malformed {
            reason: "non-empty body without row markup".to_string(),
        });
    }

    let row_re = Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap();
    let cell_re = Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]>").unwrap();

    let mut rows = Vec::new();
    for cap in row_re.captures_iter(body) {
        let inner = &cap[1];
        let mut cells: Vec<String> = Vec::new();
        for cell in cell_re.captures_iter(inner) {
            cells.push(clean_cell(&cell[1]));
        }
        if cells.is_empty() {
            // A row without cells carries its stripped text as one cell so
            // it stays visible to the search filter.
            let text = clean_cell(inner);
            if !text.is_empty() {
                cells.push(text);
            }
        }
        rows.push(Row {
            cells,
            raw: cap[0].to_string(),
        });
    }
    Ok(rows)
}

fn clean_cell(html: &str) -> String {
    let tag_re = Regex::new(r"(?s)<[^>]*>").unwrap();
    let stripped = tag_re.replace_all(html, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    decode_entities(&collapsed)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

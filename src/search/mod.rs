use crate::fragment::Row;

/// The four fixed arguments the page hands to the search collaborator on
/// every (re)initialization. Their meaning belongs to the collaborator; they
/// are carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchArgs {
    pub root: String,
    pub input_selector: String,
    pub results_selector: String,
    pub live: bool,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            root: "search".to_string(),
            input_selector: ".search-input".to_string(),
            results_selector: ".search".to_string(),
            live: true,
        }
    }
}

/// Injected search-filter collaborator. The controller re-runs `setup` after
/// every successful load/unload so newly installed rows become filterable.
pub trait SearchSetup: Send {
    fn setup(&mut self, args: &SearchArgs, rows: &[Row]);
}

/// Default collaborator: a case-insensitive substring filter over the rows
/// it was last set up with.
#[derive(Debug, Default)]
pub struct RowFilter {
    args: Option<SearchArgs>,
    index: Vec<(String, Row)>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn args(&self) -> Option<&SearchArgs> {
        self.args.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn filter(&self, query: &str) -> Vec<&Row> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.index.iter().map(|(_, row)| row).collect();
        }
        self.index
            .iter()
            .filter(|(haystack, _)| haystack.contains(&needle))
            .map(|(_, row)| row)
            .collect()
    }
}

impl SearchSetup for RowFilter {
    fn setup(&mut self, args: &SearchArgs, rows: &[Row]) {
        self.args = Some(args.clone());
        self.index = rows
            .iter()
            .map(|row| (row.text().to_lowercase(), row.clone()))
            .collect();
    }
}

use serde::Serialize;

use crate::panel::{Indicator, Panel, PanelState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct PanelRecord {
    pub category: String,
    pub state: PanelState,
    pub indicator: Indicator,
    pub rows: Vec<Vec<String>>,
}

pub fn build_records(panels: &[Panel]) -> Vec<PanelRecord> {
    panels
        .iter()
        .map(|panel| PanelRecord {
            category: panel.name.clone(),
            state: panel.state,
            indicator: panel.indicator,
            rows: panel.rows.iter().map(|row| row.cells.clone()).collect(),
        })
        .collect()
}

pub fn render_text(records: &[PanelRecord]) -> Vec<u8> {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "[{}] {} ({} rows)\n",
            record.state.as_str(),
            record.category,
            record.rows.len()
        ));
        for row in record.rows.iter() {
            out.push_str("  ");
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
    }
    out.into_bytes()
}

pub fn render_json(records: &[PanelRecord]) -> Vec<u8> {
    match serde_json::to_vec_pretty(records) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            bytes
        }
        Err(_) => b"[]\n".to_vec(),
    }
}

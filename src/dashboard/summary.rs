use super::table::ResultTable;
use serde::Serialize;
use std::collections::HashMap;

/// Per-label counts, largest first; ties keep the order labels first appear in the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentCounts {
    entries: Vec<(String, usize)>,
}

impl SentimentCounts {
    pub fn from_table(table: &ResultTable) -> Self {
        let mut entries: Vec<(String, usize)> = Vec::new();
        for row in table.rows() {
            match entries.iter_mut().find(|(label, _)| *label == row.sentiment) {
                Some((_, count)) => *count += 1,
                None => entries.push((row.sentiment.clone(), 1)),
            }
        }
        // Stable sort keeps first-appearance order among equal counts.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> usize {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Share of `count` in the total, as a percentage.
    pub fn percentage(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            total => count as f64 * 100.0 / total as f64,
        }
    }
}

const POSITIVE_COLOR: &str = "#4CAF50";
const NEGATIVE_COLOR: &str = "#F44336";
const NEUTRAL_COLOR: &str = "#9E9E9E";

/// Colors for labels outside positive/negative/neutral, handed out in order.
const FALLBACK_COLORS: &[&str] = &[
    "#2196F3", "#FF9800", "#9C27B0", "#00BCD4", "#FFC107", "#795548", "#3F51B5", "#E91E63",
];

/// Label-keyed chart colors.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    assigned: HashMap<String, &'static str>,
}

impl Palette {
    /// Assign colors for every label in `counts`. Unknown labels get fallback colors in the
    /// order they appear, cycling when the fallback list runs out.
    pub fn for_counts(counts: &SentimentCounts) -> Self {
        let mut assigned = HashMap::new();
        let mut next_fallback = 0;
        for (label, _) in counts.entries() {
            let color = Self::known_color(label).unwrap_or_else(|| {
                let color = FALLBACK_COLORS[next_fallback % FALLBACK_COLORS.len()];
                next_fallback += 1;
                color
            });
            assigned.insert(label.clone(), color);
        }
        Self { assigned }
    }

    fn known_color(label: &str) -> Option<&'static str> {
        match label.to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(POSITIVE_COLOR),
            "NEGATIVE" => Some(NEGATIVE_COLOR),
            "NEUTRAL" => Some(NEUTRAL_COLOR),
            _ => None,
        }
    }

    pub fn color(&self, label: &str) -> &'static str {
        self.assigned
            .get(label)
            .copied()
            .or_else(|| Self::known_color(label))
            .unwrap_or(FALLBACK_COLORS[0])
    }
}

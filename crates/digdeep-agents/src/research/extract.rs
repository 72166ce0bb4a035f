//! Chart data extraction from gathered snippets

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::debug;

use super::state::InformationItem;
use crate::tools::chart::{ChartKind, DataPoint};

/// Where a chart's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// Supplied with the research brief
    Directive,
    /// Labelled pairs found in the snippets
    Pairs,
    /// First number of each snippet
    FirstNumbers,
    /// Synthesized placeholder data
    Mock,
}

impl DataOrigin {
    pub fn describe(&self) -> &'static str {
        match self {
            DataOrigin::Directive => "Graph created from brief data.",
            DataOrigin::Pairs | DataOrigin::FirstNumbers => "Graph created from extracted data.",
            DataOrigin::Mock => "No structured data found. Mock data generated for visualization.",
        }
    }
}

/// Find "{x}: <label>, {y}: <number>" pairs in every snippet
pub fn labelled_pairs(items: &[InformationItem], x_label: &str, y_label: &str) -> Vec<DataPoint> {
    let pattern = format!(
        r"{}[:\s]*([\w\-]+)[,;\s]+{}[:\s]*([\d\.]+)",
        regex::escape(x_label),
        regex::escape(y_label)
    );
    let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            debug!(error = %e, "Axis labels produced an invalid pattern");
            return Vec::new();
        }
    };

    items
        .iter()
        .flat_map(|item| {
            re.captures_iter(&item.snippet)
                .filter_map(|caps| {
                    // Formatted snippets end in "...", which the value class swallows
                    let value = caps.get(2)?.as_str().trim_end_matches('.').parse::<f64>().ok()?;
                    Some(DataPoint::new(caps.get(1)?.as_str(), value))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// First number in each snippet, labelled "{x} {n}" by item position
pub fn first_numbers(items: &[InformationItem], x_label: &str) -> Vec<DataPoint> {
    let re = match Regex::new(r"\d+(\.\d+)?") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let m = re.find(&item.snippet)?;
            let value = m.as_str().parse::<f64>().ok()?;
            Some(DataPoint::new(format!("{} {}", x_label, idx + 1), value))
        })
        .collect()
}

/// Placeholder data so a chart always renders
pub fn mock_points(kind: ChartKind, x_label: &str) -> Vec<DataPoint> {
    match kind {
        ChartKind::Bar | ChartKind::Line => (0..10)
            .map(|i| DataPoint::new(format!("{} {}", x_label, i + 1), (10 + 2 * i + i % 3) as f64))
            .collect(),
        ChartKind::Pie => (0..5)
            .map(|i| DataPoint::new(format!("{} {}", x_label, i + 1), (20 + 5 * i) as f64))
            .collect(),
    }
}

/// Pick chart data: brief data, then labelled pairs, then first numbers, then mock
pub fn chart_points(
    directive_data: &[DataPoint],
    items: &[InformationItem],
    kind: ChartKind,
    x_label: &str,
    y_label: &str,
) -> (Vec<DataPoint>, DataOrigin) {
    if !directive_data.is_empty() {
        return (directive_data.to_vec(), DataOrigin::Directive);
    }

    let pairs = labelled_pairs(items, x_label, y_label);
    if !pairs.is_empty() {
        return (pairs, DataOrigin::Pairs);
    }

    let numbers = first_numbers(items, x_label);
    if !numbers.is_empty() {
        return (numbers, DataOrigin::FirstNumbers);
    }

    (mock_points(kind, x_label), DataOrigin::Mock)
}

/// Convert model-supplied graph data into points
///
/// Accepts a list of objects (`[{"name": "Gym A", "price": 120000}]`),
/// taking `name`/`value` when present and otherwise the first string and
/// first number in each object, or a single object of label to number
/// pairs (`{"2020": 2.5, "2021": 2.7}`). Entries without a number are
/// skipped.
pub fn points_from_json(data: &Value) -> Vec<DataPoint> {
    match data {
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| point_from_entry(entry, i))
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| as_number(v).map(|n| DataPoint::new(k.clone(), n)))
            .collect(),
        _ => Vec::new(),
    }
}

fn point_from_entry(entry: &Value, index: usize) -> Option<DataPoint> {
    let obj = entry.as_object()?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| obj.values().find_map(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Item {}", index + 1));

    let value = obj
        .get("value")
        .and_then(as_number)
        .or_else(|| obj.values().find_map(|v| v.as_f64()))?;

    Some(DataPoint::new(name, value))
}

fn as_number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

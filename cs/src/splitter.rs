//! Splits oversized payloads into token-bounded fragments
//!
//! Splitting is greedy bin-packing over the payload's records, in order.
//! Records are never split or reordered: each fragment holds a contiguous
//! slice, and concatenating the slices gives back the original sequence.
//!
//! Payload layouts, in order of preference:
//!
//! - **Rows**: an object with an array field; the largest one holds the
//!   records. Every other field is metadata and is repeated in each fragment.
//!   Zero fragments only when every array field is empty.
//! - **Array**: a top-level array; each fragment is an array.
//! - **Keys**: any other object (or one whose metadata alone is over budget)
//!   is split between whole top-level keys.
//! - **Scalar**: cannot be split; one best-effort fragment.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::estimator::TokenEstimator;

/// Field names preferred when array fields are the same size
const ROW_FIELD_NAMES: &[&str] = &["rows", "data", "results", "items", "records"];

/// One token-bounded piece of a split payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Zero-based position in the chunk set
    pub index: usize,
    /// Total number of fragments in the chunk set
    pub total: usize,
    /// Fragment payload
    pub data: Value,
    /// Number of records (rows or keys) in this fragment
    pub record_count: usize,
    /// A single record that alone exceeds the budget
    pub oversized: bool,
}

/// How a payload was partitioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Layout {
    Rows { field: String },
    Array,
    Keys,
    Scalar,
}

/// Result of splitting a payload
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub fragments: Vec<Fragment>,
    pub layout: Layout,
    pub total_records: usize,
}

impl SplitOutcome {
    /// Name of the rows field for tabular payloads
    pub fn rows_field(&self) -> Option<&str> {
        match &self.layout {
            Layout::Rows { field } => Some(field),
            _ => None,
        }
    }

    pub fn has_oversized(&self) -> bool {
        self.fragments.iter().any(|f| f.oversized)
    }
}

/// A packed range of records
#[derive(Debug, Clone, PartialEq, Eq)]
struct Packed {
    range: Range<usize>,
    tokens: usize,
    oversized: bool,
}

/// Splits payloads against a token budget
pub struct Splitter<'a> {
    estimator: &'a TokenEstimator,
    budget: usize,
}

impl<'a> Splitter<'a> {
    pub fn new(estimator: &'a TokenEstimator, budget: usize) -> Self {
        Self { estimator, budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Split a payload into ordered fragments
    pub fn split(&self, payload: &Value) -> SplitOutcome {
        debug!(budget = self.budget, "Splitter::split: called");
        let outcome = match payload {
            Value::Object(map) => match find_rows_field(map) {
                Some((field, rows)) => self
                    .split_rows(map, field, rows)
                    .unwrap_or_else(|| self.split_keys(map)),
                None => self.split_keys(map),
            },
            Value::Array(items) => self.split_array(items),
            scalar => self.split_scalar(scalar),
        };
        debug!(
            fragments = outcome.fragments.len(),
            total_records = outcome.total_records,
            layout = ?outcome.layout,
            "Splitter::split: returning"
        );
        outcome
    }

    /// Returns None when the metadata alone does not fit
    fn split_rows(&self, map: &Map<String, Value>, field: &str, rows: &[Value]) -> Option<SplitOutcome> {
        let build = |range: Range<usize>| -> Value {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                if key == field {
                    out.insert(key.clone(), Value::Array(rows[range.clone()].to_vec()));
                } else {
                    out.insert(key.clone(), value.clone());
                }
            }
            Value::Object(out)
        };

        if rows.is_empty() {
            return Some(SplitOutcome {
                fragments: Vec::new(),
                layout: Layout::Rows {
                    field: field.to_string(),
                },
                total_records: 0,
            });
        }

        let base = self.estimator.estimate(&build(0..0), true);
        if base >= self.budget {
            debug!(base, %field, "Splitter::split_rows: metadata exceeds budget, splitting by key");
            return None;
        }

        let costs: Vec<usize> = rows.iter().map(|row| self.item_cost(row)).collect();
        let packed = self.pack(base, &costs, |range| self.estimator.estimate(&build(range), true));
        let fragments = self.finalize(packed, build, "row");

        Some(SplitOutcome {
            fragments,
            layout: Layout::Rows {
                field: field.to_string(),
            },
            total_records: rows.len(),
        })
    }

    fn split_array(&self, items: &[Value]) -> SplitOutcome {
        let build = |range: Range<usize>| Value::Array(items[range].to_vec());
        let base = self.estimator.estimate(&Value::Array(Vec::new()), true);
        let costs: Vec<usize> = items.iter().map(|item| self.item_cost(item)).collect();
        let packed = self.pack(base, &costs, |range| self.estimator.estimate(&build(range), true));

        SplitOutcome {
            fragments: self.finalize(packed, build, "row"),
            layout: Layout::Array,
            total_records: items.len(),
        }
    }

    fn split_keys(&self, map: &Map<String, Value>) -> SplitOutcome {
        let entries: Vec<(&String, &Value)> = map.iter().collect();
        let build = |range: Range<usize>| -> Value {
            let out: Map<String, Value> = entries[range]
                .iter()
                .map(|(k, v)| ((*k).clone(), (*v).clone()))
                .collect();
            Value::Object(out)
        };

        let base = self.estimator.estimate(&Value::Object(Map::new()), true);
        let costs: Vec<usize> = (0..entries.len()).map(|i| self.item_cost(&build(i..i + 1))).collect();
        let packed = self.pack(base, &costs, |range| self.estimator.estimate(&build(range), true));

        SplitOutcome {
            fragments: self.finalize(packed, build, "key"),
            layout: Layout::Keys,
            total_records: entries.len(),
        }
    }

    fn split_scalar(&self, value: &Value) -> SplitOutcome {
        let tokens = self.estimator.estimate(value, true);
        let oversized = tokens > self.budget;
        if oversized {
            warn!(tokens, budget = self.budget, "Scalar payload exceeds budget and cannot be split");
        }

        SplitOutcome {
            fragments: vec![Fragment {
                index: 0,
                total: 1,
                data: value.clone(),
                record_count: 1,
                oversized,
            }],
            layout: Layout::Scalar,
            total_records: 1,
        }
    }

    /// Conservative additive cost of one record inside a fragment
    ///
    /// Adds one token per line for the extra indentation the record picks up
    /// when nested, plus one for the separator.
    fn item_cost(&self, item: &Value) -> usize {
        let lines = format!("{:#}", item).lines().count();
        self.estimator.estimate(item, true) + lines + 1
    }

    /// Greedy packing with exact verification
    ///
    /// Accumulates records while the additive cost fits, then measures the
    /// closed range exactly and trims from the tail until it fits. A range
    /// always keeps at least one record.
    fn pack(&self, base: usize, costs: &[usize], measure: impl Fn(Range<usize>) -> usize) -> Vec<Packed> {
        let mut packed = Vec::new();
        let mut start = 0;

        while start < costs.len() {
            let mut end = start;
            let mut running = base;
            while end < costs.len() {
                let cost = costs[end];
                if end > start && running + cost > self.budget {
                    break;
                }
                running += cost;
                end += 1;
            }

            let mut tokens = measure(start..end);
            while tokens > self.budget && end - start > 1 {
                let len = end - start;
                let scaled = len * self.budget / tokens;
                let next_len = scaled.clamp(1, len - 1);
                debug!(len, next_len, tokens, "Splitter::pack: trimming range");
                end = start + next_len;
                tokens = measure(start..end);
            }

            packed.push(Packed {
                range: start..end,
                tokens,
                oversized: tokens > self.budget,
            });
            start = end;
        }

        packed
    }

    fn finalize(&self, packed: Vec<Packed>, build: impl Fn(Range<usize>) -> Value, unit: &str) -> Vec<Fragment> {
        let total = packed.len();
        packed
            .into_iter()
            .enumerate()
            .map(|(index, p)| {
                if p.oversized {
                    warn!(
                        index,
                        tokens = p.tokens,
                        budget = self.budget,
                        unit,
                        "Single record exceeds budget, emitting oversized fragment"
                    );
                }
                Fragment {
                    index,
                    total,
                    record_count: p.range.len(),
                    data: build(p.range),
                    oversized: p.oversized,
                }
            })
            .collect()
    }
}

/// Find the rows field of an object
///
/// The array field with the largest serialized size wins. Conventional
/// names only break ties, so an empty or tiny `items` never shadows the
/// array that actually holds the records.
fn find_rows_field(map: &Map<String, Value>) -> Option<(&str, &[Value])> {
    map.iter()
        .filter_map(|(key, value)| match value {
            Value::Array(rows) => {
                let conventional = ROW_FIELD_NAMES.contains(&key.as_str());
                Some((key.as_str(), rows.as_slice(), (value.to_string().len(), conventional)))
            }
            _ => None,
        })
        .fold(None, |best: Option<(&str, &[Value], (usize, bool))>, candidate| match best {
            Some(b) if b.2 >= candidate.2 => Some(b),
            _ => Some(candidate),
        })
        .map(|(key, rows, _)| (key, rows))
}

/// Concatenate the rows of fragments produced from a rows or array layout
pub fn collect_rows(layout: &Layout, fragments: &[Fragment]) -> Vec<Value> {
    let mut rows = Vec::new();
    for fragment in fragments {
        match (layout, &fragment.data) {
            (Layout::Rows { field }, Value::Object(map)) => {
                if let Some(Value::Array(slice)) = map.get(field) {
                    rows.extend(slice.iter().cloned());
                }
            }
            (Layout::Array, Value::Array(slice)) => rows.extend(slice.iter().cloned()),
            _ => {}
        }
    }
    rows
}

use std::fmt::Display;

use getset::CopyGetters;
use indexmap::IndexMap;

use crate::schema::{CourseRecord, Field, Placeholder};

#[derive(Clone, Copy, PartialEq, Debug, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FieldCoverage {
    present: usize,
    missing: usize,
    percent_present: f64,
}

/// Per-field fill rates over a batch of records.
///
/// A field counts as present when it holds non-blank text other than the placeholder,
/// so the percentages measure what was actually extracted.
#[derive(Clone, PartialEq, Debug)]
pub struct CompletenessReport {
    total: usize,
    fields: IndexMap<Field, FieldCoverage>,
}

impl CompletenessReport {
    pub fn build(records: &[CourseRecord], placeholder: &Placeholder) -> Self {
        let total = records.len();
        let mut fields = IndexMap::new();
        if total == 0 {
            return Self { total, fields };
        }
        for field in Field::all() {
            let present = records
                .iter()
                .map(|record| record.get(field).trim())
                .filter(|text| !text.is_empty() && *text != placeholder.trim())
                .count();
            fields.insert(
                field,
                FieldCoverage {
                    present,
                    missing: total - present,
                    percent_present: percentage(present, total),
                },
            );
        }
        Self { total, fields }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fields(&self) -> &IndexMap<Field, FieldCoverage> {
        &self.fields
    }
}

/// One decimal place, ties rounded to even.
fn percentage(present: usize, total: usize) -> f64 {
    (present as f64 * 1000. / total as f64).round_ties_even() / 10.
}

impl Display for CompletenessReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Data completeness summary:")?;
        write!(f, "Total courses: {}", self.total)?;
        for (field, coverage) in &self.fields {
            write!(
                f,
                "\n  - {field}: {}/{} present ({:.1}% coverage)",
                coverage.present, self.total, coverage.percent_present
            )?;
        }
        Ok(())
    }
}

use std::fmt::Display;

use deranged::RangedU16;
use derive_more::{AsRef, Deref, Display as DeriveDisplay};
use getset::Getters;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// The fixed course schema.
/// Variant order is the column order of every exported CSV.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Code,
    Title,
    Uoc,
    Overview,
    ConditionsForEnrolment,
    Faculty,
    StudyLevel,
    OfferingTerms,
    FieldOfEducation,
    School,
}
impl Field {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn all() -> impl Iterator<Item = Field> {
        Field::iter()
    }

    /// Short human-readable description, used when instructing the extractor.
    pub fn description(self) -> &'static str {
        use Field::*;
        match self {
            Code => "the course code (e.g. COMP1511)",
            Title => "the course title",
            Uoc => "units of credit as a string",
            Overview => "a concise summary paragraph",
            ConditionsForEnrolment => "prerequisites or enrolment rules",
            Faculty => "the faculty responsible for the course",
            StudyLevel => "Undergraduate or Postgraduate label",
            OfferingTerms => "term availability such as \"Term 1\" or \"Summer\"",
            FieldOfEducation => "the field of education value as listed on the page",
            School => "the school that teaches the course",
        }
    }
}
impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fallback text written into a field that could not be extracted.
#[derive(Clone, PartialEq, Eq, Debug, AsRef, Deref, DeriveDisplay, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Placeholder(String);
impl Placeholder {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}
impl Default for Placeholder {
    fn default() -> Self {
        Self::new("Not specified")
    }
}

/// Handbook year; always four digits.
pub type Year = RangedU16<1000, 9999>;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StudyLevel {
    #[default]
    Undergraduate,
    Postgraduate,
}
impl Display for StudyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StudyLevel::Undergraduate => "undergraduate",
            StudyLevel::Postgraduate => "postgraduate",
        })
    }
}

/// A normalised course entry; every field holds non-blank text.
#[derive(Clone, PartialEq, Eq, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct CourseRecord {
    code: String,
    title: String,
    uoc: String,
    overview: String,
    conditions_for_enrolment: String,
    faculty: String,
    study_level: String,
    offering_terms: String,
    field_of_education: String,
    school: String,
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum RecordValidationError {
    #[error("Field `{0}` is blank")]
    BlankField(Field),
}

impl CourseRecord {
    /// Builds a record from a value provider called once per schema field.
    pub fn from_fields<F>(mut value_of: F) -> Result<Self, RecordValidationError>
    where
        F: FnMut(Field) -> String,
    {
        let mut take = |field| {
            let value = value_of(field);
            if value.trim().is_empty() {
                Err(RecordValidationError::BlankField(field))
            } else {
                Ok(value)
            }
        };
        Ok(Self {
            code: take(Field::Code)?,
            title: take(Field::Title)?,
            uoc: take(Field::Uoc)?,
            overview: take(Field::Overview)?,
            conditions_for_enrolment: take(Field::ConditionsForEnrolment)?,
            faculty: take(Field::Faculty)?,
            study_level: take(Field::StudyLevel)?,
            offering_terms: take(Field::OfferingTerms)?,
            field_of_education: take(Field::FieldOfEducation)?,
            school: take(Field::School)?,
        })
    }

    pub fn get(&self, field: Field) -> &str {
        use Field::*;
        match field {
            Code => &self.code,
            Title => &self.title,
            Uoc => &self.uoc,
            Overview => &self.overview,
            ConditionsForEnrolment => &self.conditions_for_enrolment,
            Faculty => &self.faculty,
            StudyLevel => &self.study_level,
            OfferingTerms => &self.offering_terms,
            FieldOfEducation => &self.field_of_education,
            School => &self.school,
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{CourseRecord, Field, RecordValidationError};

    #[test]
    fn test_field_order_matches_record_layout() {
        let names = Field::all().map(Field::name).collect_vec();
        assert_eq!(
            names,
            [
                "code",
                "title",
                "uoc",
                "overview",
                "conditions_for_enrolment",
                "faculty",
                "study_level",
                "offering_terms",
                "field_of_education",
                "school",
            ]
        );
        let record = CourseRecord::from_fields(|field| field.name().to_uppercase()).unwrap();
        for field in Field::all() {
            assert_eq!(record.get(field), field.name().to_uppercase());
        }
        let json = serde_json::to_value(&record).unwrap();
        let keys = json.as_object().unwrap().keys().cloned().collect_vec();
        assert_eq!(keys.len(), 10);
        for field in Field::all() {
            assert!(keys.iter().any(|k| k == field.name()));
        }
    }

    #[test]
    fn test_blank_field_is_rejected() {
        let res = CourseRecord::from_fields(|field| match field {
            Field::Faculty => "  ".to_owned(),
            _ => "x".to_owned(),
        });
        assert_eq!(res, Err(RecordValidationError::BlankField(Field::Faculty)));
    }
}

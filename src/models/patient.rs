use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Ages are accepted strictly between these bounds.
pub const MIN_AGE: i64 = 0;
pub const MAX_AGE: i64 = 120;

/// Gender as written to storage. Only `Male` and `Female` pass validation;
/// any other string lands in `Other` so older files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(untagged)]
    Other(String),
}

/// BMI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Underweight,
    Healthy,
    Overweight,
    Obese,
}

impl Verdict {
    /// Classify a (rounded) BMI value.
    ///
    /// Values in `[24.9, 25)` fall through to `Obese`.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Verdict::Underweight
        } else if bmi < 24.9 {
            Verdict::Healthy
        } else if (25.0..29.9).contains(&bmi) {
            Verdict::Overweight
        } else {
            Verdict::Obese
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Underweight => "Underweight",
            Verdict::Healthy => "Healthy",
            Verdict::Overweight => "Overweight",
            Verdict::Obese => "Obese",
        };
        f.write_str(label)
    }
}

/// Body-mass index for a height in centimeters and weight in kilograms,
/// rounded to two decimals.
pub fn bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let meters = height_cm / 100.0;
    round2(weight_kg / (meters * meters))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Patient fields as persisted. The identifier is the collection key and is
/// never stored inside the value; `bmi` and `verdict` are derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    pub city: String,
    #[serde(deserialize_with = "whole_number")]
    pub age: i64,
    pub gender: Gender,
    /// Centimeters.
    pub height: f64,
    /// Kilograms.
    pub weight: f64,
}

impl PatientRecord {
    pub fn bmi(&self) -> f64 {
        bmi(self.height, self.weight)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_bmi(self.bmi())
    }

    /// Record plus derived fields, as returned to clients.
    pub fn view(&self) -> PatientView {
        let bmi = self.bmi();
        PatientView {
            record: self.clone(),
            bmi,
            verdict: Verdict::from_bmi(bmi),
        }
    }
}

impl Validate for PatientRecord {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "name", &self.name);
        check_text(&mut errors, "city", &self.city);
        check_age(&mut errors, self.age);
        check_gender(&mut errors, &self.gender);
        check_positive(&mut errors, "height", self.height);
        check_positive(&mut errors, "weight", self.weight);
        into_result(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub record: PatientRecord,
    pub bmi: f64,
    pub verdict: Verdict,
}

/// Payload for creating a patient: the identifier plus every base field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub id: String,
    pub name: String,
    pub city: String,
    #[serde(deserialize_with = "whole_number")]
    pub age: i64,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
}

impl NewPatient {
    pub fn into_parts(self) -> (String, PatientRecord) {
        let record = PatientRecord {
            name: self.name,
            city: self.city,
            age: self.age,
            gender: self.gender,
            height: self.height,
            weight: self.weight,
        };
        (self.id, record)
    }
}

impl Validate for NewPatient {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "id", &self.id);
        check_text(&mut errors, "name", &self.name);
        check_text(&mut errors, "city", &self.city);
        check_age(&mut errors, self.age);
        check_gender(&mut errors, &self.gender);
        check_positive(&mut errors, "height", self.height);
        check_positive(&mut errors, "weight", self.weight);
        into_result(errors)
    }
}

/// Partial update. Absent (or `null`) fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl PatientUpdate {
    /// Overlay the supplied fields onto `existing`. The result still has to
    /// pass [`Validate`] before it may be stored.
    pub fn merge_onto(self, existing: &PatientRecord) -> PatientRecord {
        PatientRecord {
            name: self.name.unwrap_or_else(|| existing.name.clone()),
            city: self.city.unwrap_or_else(|| existing.city.clone()),
            age: self.age.unwrap_or(existing.age),
            gender: self.gender.unwrap_or_else(|| existing.gender.clone()),
            height: self.height.unwrap_or(existing.height),
            weight: self.weight.unwrap_or(existing.weight),
        }
    }
}

impl Validate for PatientUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_text(&mut errors, "name", name);
        }
        if let Some(city) = &self.city {
            check_text(&mut errors, "city", city);
        }
        if let Some(age) = self.age {
            check_age(&mut errors, age);
        }
        if let Some(gender) = &self.gender {
            check_gender(&mut errors, gender);
        }
        if let Some(height) = self.height {
            check_positive(&mut errors, "height", height);
        }
        if let Some(weight) = self.weight {
            check_positive(&mut errors, "weight", weight);
        }
        into_result(errors)
    }
}

fn check_text(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some(Cow::Borrowed("must not be empty"));
        err.add_param(Cow::Borrowed("min"), &1);
        errors.add(field, err);
    }
}

fn check_age(errors: &mut ValidationErrors, age: i64) {
    if age <= MIN_AGE || age >= MAX_AGE {
        let mut err = ValidationError::new("range");
        err.message = Some(Cow::Owned(format!(
            "must be greater than {MIN_AGE} and less than {MAX_AGE}"
        )));
        err.add_param(Cow::Borrowed("value"), &age);
        errors.add("age", err);
    }
}

fn check_gender(errors: &mut ValidationErrors, gender: &Gender) {
    if let Gender::Other(value) = gender {
        let mut err = ValidationError::new("enum");
        err.message = Some(Cow::Borrowed("must be Male or Female"));
        err.add_param(Cow::Borrowed("value"), value);
        errors.add("gender", err);
    }
}

fn check_positive(errors: &mut ValidationErrors, field: &'static str, value: f64) {
    // NaN and infinities never reach here through JSON, but a record built in
    // code could carry them.
    if !(value.is_finite() && value > 0.0) {
        let mut err = ValidationError::new("range");
        err.message = Some(Cow::Borrowed("must be greater than 0"));
        if value.is_finite() {
            err.add_param(Cow::Borrowed("value"), &value);
        }
        errors.add(field, err);
    }
}

/// Integer that may arrive as a float with no fractional part (`30.0`).
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(WholeNumber)
}

fn optional_whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "whole_number")] i64);

    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(value)| value))
}

struct WholeNumber;

impl<'de> Visitor<'de> for WholeNumber {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(E::invalid_value(Unexpected::Float(value), &self))
        }
    }
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

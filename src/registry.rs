//! Patient registry operations.
//!
//! Each operation runs against the [`PatientStore`] and returns a typed
//! result; translating outcomes into HTTP responses is left to `api`.

use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationErrors};

use crate::db::{PatientStore, StoreError};
use crate::models::patient::{NewPatient, PatientRecord, PatientUpdate, PatientView};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Patient not found")]
    NotFound(String),

    #[error("Patient with this ID already exists")]
    AlreadyExists(String),

    #[error("Invalid sort field selected from ['height', 'weight', 'bmi']")]
    InvalidSortField(String),

    #[error("Invalid sort order selected. Please select asc or desc")]
    InvalidSortOrder(String),

    #[error("invalid patient data: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Height,
    Weight,
    Bmi,
}

impl SortField {
    fn key(self, patient: &PatientView) -> f64 {
        match self {
            SortField::Height => patient.record.height,
            SortField::Weight => patient.record.weight,
            SortField::Bmi => patient.bmi,
        }
    }
}

impl FromStr for SortField {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "height" => Ok(SortField::Height),
            "weight" => Ok(SortField::Weight),
            "bmi" => Ok(SortField::Bmi),
            other => Err(RegistryError::InvalidSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(RegistryError::InvalidSortOrder(other.to_string())),
        }
    }
}

/// Patient operations over a shared store handle.
#[derive(Debug, Clone)]
pub struct PatientRegistry {
    store: PatientStore,
}

impl PatientRegistry {
    pub fn new(store: PatientStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PatientStore {
        &self.store
    }

    /// Every patient keyed by id, with derived fields, in insertion order.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<IndexMap<String, PatientView>, RegistryError> {
        let patients: IndexMap<String, PatientView> = self
            .store
            .read(|patients| {
                patients
                    .iter()
                    .map(|(id, record)| (id.clone(), record.view()))
                    .collect()
            })
            .await?;
        Ok(patients)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, patient_id: &str) -> Result<PatientView, RegistryError> {
        self.store
            .read(|patients| patients.get(patient_id).map(PatientRecord::view))
            .await?
            .ok_or_else(|| RegistryError::NotFound(patient_id.to_string()))
    }

    /// Records ordered by `sort_by`. Parameters are checked before the store
    /// is touched. The sort is stable; ties keep insertion order.
    #[instrument(skip(self))]
    pub async fn sorted(&self, sort_by: &str, order: &str) -> Result<Vec<PatientView>, RegistryError> {
        let field: SortField = sort_by.parse()?;
        let order: SortOrder = order.parse()?;

        let mut patients: Vec<PatientView> = self
            .store
            .read(|patients| patients.values().map(PatientRecord::view).collect())
            .await?;

        patients.sort_by(|a, b| {
            let ord = field.key(a).total_cmp(&field.key(b));
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        Ok(patients)
    }

    /// Insert a new patient. Duplicate ids are rejected before validation.
    #[instrument(skip(self, patient), fields(patient_id = %patient.id))]
    pub async fn create(&self, patient: NewPatient) -> Result<PatientView, RegistryError> {
        let view = self
            .store
            .transaction(|patients| {
                if patients.contains_key(&patient.id) {
                    return Err(RegistryError::AlreadyExists(patient.id.clone()));
                }
                patient.validate()?;
                let (id, record) = patient.into_parts();
                let view = record.view();
                patients.insert(id, record);
                Ok(view)
            })
            .await
            .map_err(log_rejection)?;

        info!(bmi = view.bmi, verdict = %view.verdict, "patient created");
        Ok(view)
    }

    /// Merge `update` onto the stored record and re-validate the result.
    /// The payload itself is checked first, so a bad body is reported even
    /// for an unknown id.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        patient_id: &str,
        update: PatientUpdate,
    ) -> Result<PatientView, RegistryError> {
        update
            .validate()
            .map_err(|errors| log_rejection(errors.into()))?;

        let view = self
            .store
            .transaction(|patients| {
                let existing = patients
                    .get(patient_id)
                    .ok_or_else(|| RegistryError::NotFound(patient_id.to_string()))?;
                let merged = update.merge_onto(existing);
                merged.validate()?;
                let view = merged.view();
                patients.insert(patient_id.to_string(), merged);
                Ok(view)
            })
            .await
            .map_err(log_rejection)?;

        info!(bmi = view.bmi, verdict = %view.verdict, "patient updated");
        Ok(view)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, patient_id: &str) -> Result<(), RegistryError> {
        self.store
            .transaction(|patients| match patients.shift_remove(patient_id) {
                Some(_) => Ok(()),
                None => Err(RegistryError::NotFound(patient_id.to_string())),
            })
            .await
            .map_err(log_rejection)?;

        info!("patient deleted");
        Ok(())
    }
}

fn log_rejection(err: RegistryError) -> RegistryError {
    if !matches!(err, RegistryError::Store(_)) {
        warn!(error = %err, "request rejected");
    }
    err
}

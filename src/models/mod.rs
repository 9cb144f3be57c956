//! Data models for the patient registry.

pub mod patient;

pub use patient::{Gender, NewPatient, PatientRecord, PatientUpdate, PatientView, Verdict};

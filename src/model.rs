//! Entities as the REST backend serves them, plus the request payloads.
//!
//! Rust field names are English; the wire keeps the backend's names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "idAlumno", alias = "id", default)]
    pub id: String,
    #[serde(rename = "nombres", default)]
    pub first_names: String,
    #[serde(rename = "apellidos", default)]
    pub last_names: String,
    #[serde(rename = "fechaIngreso", default)]
    pub enrollment_date: String,
    #[serde(rename = "direccion", default)]
    pub address: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "idMateria", alias = "id", default)]
    pub id: String,
    #[serde(rename = "nombreMateria", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "idDocente", alias = "id", default)]
    pub id: String,
    #[serde(rename = "nombres", default)]
    pub first_names: String,
    #[serde(rename = "apellidos", default)]
    pub last_names: String,
    #[serde(rename = "fechaIngreso", default)]
    pub hire_date: String,
}

impl Teacher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

/// Raw enrollment row: foreign ids only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: String,
    #[serde(rename = "alumnoId")]
    pub student_id: String,
    #[serde(rename = "materiaId")]
    pub subject_id: String,
    #[serde(rename = "docenteId")]
    pub teacher_id: String,
    #[serde(rename = "ciclo")]
    pub period: String,
    #[serde(rename = "notaFinal")]
    pub grade: f64,
}

/// Display row produced by the resolver. Never sent back to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: String,
    pub student_name: String,
    pub subject_name: String,
    pub teacher_first_names: String,
    pub teacher_last_names: String,
    pub teacher_full_name: String,
    pub period: String,
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCardLine {
    pub id: String,
    #[serde(rename = "materiaNombre")]
    pub subject_name: String,
    #[serde(rename = "notaFinal")]
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentPayload {
    #[serde(rename = "alumnoId")]
    pub student_id: String,
    #[serde(rename = "materiaId")]
    pub subject_id: String,
    #[serde(rename = "docenteId")]
    pub teacher_id: String,
    #[serde(rename = "ciclo")]
    pub period: String,
    #[serde(rename = "notaFinal")]
    pub grade: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentPayload {
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "fechaIngreso")]
    pub enrollment_date: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl From<&Student> for StudentPayload {
    fn from(s: &Student) -> Self {
        StudentPayload {
            first_names: s.first_names.clone(),
            last_names: s.last_names.clone(),
            enrollment_date: s.enrollment_date.clone(),
            address: s.address.clone(),
            phone: s.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectPayload {
    #[serde(rename = "nombreMateria")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherPayload {
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "fechaIngreso")]
    pub hire_date: String,
}

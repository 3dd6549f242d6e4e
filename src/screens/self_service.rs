use crate::api::{self, Backend, Resource, REPORT_CARD_PATH, STUDENT_ME_PATH};
use crate::error::ClientResult;
use crate::model::{ReportCardLine, Student, StudentPayload};
use serde::Serialize;

pub const NO_GRADES: &str = "No hay calificaciones disponibles.";

#[derive(Debug, Clone, Default)]
pub struct ReportCardScreen {
    lines: Vec<ReportCardLine>,
    error: Option<String>,
    loaded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardSnapshot<'a> {
    pub loaded: bool,
    pub lines: &'a [ReportCardLine],
    pub average: Option<f64>,
    pub average_text: Option<String>,
    pub empty_message: Option<&'static str>,
    pub error: Option<&'a str>,
}

/// Mean grade rounded to two decimals; `None` for an empty card.
pub fn average(lines: &[ReportCardLine]) -> Option<f64> {
    if lines.is_empty() {
        return None;
    }
    let mean = lines.iter().map(|l| l.grade).sum::<f64>() / lines.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

impl ReportCardScreen {
    pub fn load(&mut self, backend: &dyn Backend) -> ClientResult<()> {
        self.loaded = true;
        match api::fetch::<Vec<ReportCardLine>>(backend, REPORT_CARD_PATH) {
            Ok(lines) => {
                self.lines = lines;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.message_for("al cargar la boleta"));
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> ReportCardSnapshot<'_> {
        let avg = average(&self.lines);
        ReportCardSnapshot {
            loaded: self.loaded,
            lines: &self.lines,
            average: avg,
            average_text: avg.map(|a| format!("{a:.2}")),
            empty_message: (self.loaded && self.error.is_none() && self.lines.is_empty())
                .then_some(NO_GRADES),
            error: self.error.as_deref(),
        }
    }
}

/// The signed-in student's record. Only address and phone are editable.
#[derive(Debug, Clone, Default)]
pub struct ProfileScreen {
    student: Option<Student>,
    error: Option<String>,
    loaded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot<'a> {
    pub loaded: bool,
    pub student: Option<&'a Student>,
    pub error: Option<&'a str>,
}

impl ProfileScreen {
    pub fn load(&mut self, backend: &dyn Backend) -> ClientResult<()> {
        self.loaded = true;
        match api::fetch::<Student>(backend, STUDENT_ME_PATH) {
            Ok(student) => {
                self.student = Some(student);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.message_for("al cargar los datos"));
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub fn student(&self) -> Option<&Student> {
        self.student.as_ref()
    }

    /// PUTs the full record with the new contact fields. `None` when no
    /// profile has been loaded.
    pub fn save(
        &mut self,
        backend: &dyn Backend,
        address: &str,
        phone: &str,
    ) -> Option<ClientResult<()>> {
        let current = self.student.as_ref()?;
        let payload = StudentPayload {
            address: address.to_string(),
            phone: phone.to_string(),
            ..StudentPayload::from(current)
        };
        self.error = None;
        match api::update(backend, Resource::Students, &current.id, &payload) {
            Ok(_) => {
                if let Some(s) = self.student.as_mut() {
                    s.address = payload.address;
                    s.phone = payload.phone;
                }
                Some(Ok(()))
            }
            Err(e) => {
                self.error = Some(e.message_for("al guardar los cambios"));
                Some(Err(e))
            }
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot<'_> {
        ProfileSnapshot {
            loaded: self.loaded,
            student: self.student.as_ref(),
            error: self.error.as_deref(),
        }
    }
}

//! In-memory backend speaking the same REST contract as the remote API.
//!
//! State lives in a private SQLite `:memory:` database and disappears with
//! the session. Validation and conflict rules mirror the production service
//! so offline sessions fail the same way a real one would.

use super::{Backend, Resource, Verb};
use crate::error::{ClientError, ClientResult};
use crate::model::{EnrollmentRecord, ReportCardLine, Student, Subject, Teacher};
use anyhow::Context;
use chrono::NaiveDate;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Mutex;
use uuid::Uuid;

const NAME_MAX: usize = 100;
const ADDRESS_MAX: usize = 255;
const SUBJECT_NAME_MIN: usize = 3;
const BACKEND_GRADE_MAX: f64 = 100.0;

/// Identity the local backend acts for. `permissions: None` skips the
/// authority checks entirely.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub subject: Option<String>,
    pub permissions: Option<BTreeSet<String>>,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct Rejection {
    status: u16,
    message: String,
}

impl Rejection {
    fn new(status: u16, message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(Rejection {
            status,
            message: message.into(),
        })
    }
}

fn bad_request(message: impl Into<String>) -> anyhow::Error {
    Rejection::new(400, message)
}

fn not_found(message: impl Into<String>) -> anyhow::Error {
    Rejection::new(404, message)
}

fn conflict(message: impl Into<String>) -> anyhow::Error {
    Rejection::new(409, message)
}

fn reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        _ => "Internal Server Error",
    }
}

pub struct LocalBackend {
    conn: Mutex<Connection>,
    caller: Caller,
}

impl LocalBackend {
    pub fn open(caller: Caller) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        init_schema(&conn)?;
        Ok(LocalBackend {
            conn: Mutex::new(conn),
            caller,
        })
    }

    fn authorize(&self, verb: Verb, resource: Resource) -> anyhow::Result<()> {
        let Some(perms) = &self.caller.permissions else {
            return Ok(());
        };
        let action = match verb {
            Verb::Get => "READ",
            Verb::Post | Verb::Put => "WRITE",
            Verb::Delete => "DELETE",
        };
        let needed = format!("{action}:{}", authority(resource));
        if perms.contains(&needed) {
            Ok(())
        } else {
            Err(Rejection::new(403, "Access Denied"))
        }
    }

    fn route(
        &self,
        conn: &Connection,
        verb: Verb,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> anyhow::Result<serde_json::Value> {
        let decoded = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).map(|d| d.into_owned()))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|_| bad_request(format!("Ruta inválida: {path}")))?;
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
        let Some((head, rest)) = segments.split_first() else {
            return Err(not_found(format!("Recurso no encontrado: {path}")));
        };
        let resource = match *head {
            "alumnos" => Resource::Students,
            "materias" => Resource::Subjects,
            "docentes" => Resource::Teachers,
            "alumno-materias" => Resource::Enrollments,
            _ => return Err(not_found(format!("Recurso no encontrado: {path}"))),
        };
        self.authorize(verb, resource)?;
        let subject = self.caller.subject.as_deref();

        match (resource, verb, rest) {
            (Resource::Students, Verb::Get, []) => list_students(conn),
            (Resource::Students, Verb::Post, []) => create_student(conn, parse_body(body)?, subject),
            (Resource::Students, Verb::Get, ["me"]) => student_me(conn, subject),
            (Resource::Students, Verb::Get, [id]) => get_student(conn, id),
            (Resource::Students, Verb::Put, [id]) => update_student(conn, id, parse_body(body)?),
            (Resource::Students, Verb::Delete, [id]) => delete_student(conn, id),

            (Resource::Subjects, Verb::Get, []) => list_subjects(conn),
            (Resource::Subjects, Verb::Post, []) => create_subject(conn, parse_body(body)?),
            (Resource::Subjects, Verb::Get, [id]) => get_subject(conn, id),
            (Resource::Subjects, Verb::Put, [id]) => update_subject(conn, id, parse_body(body)?),
            (Resource::Subjects, Verb::Delete, [id]) => delete_subject(conn, id),

            (Resource::Teachers, Verb::Get, []) => list_teachers(conn),
            (Resource::Teachers, Verb::Post, []) => create_teacher(conn, parse_body(body)?),
            (Resource::Teachers, Verb::Get, [id]) => get_teacher(conn, id),
            (Resource::Teachers, Verb::Put, [id]) => update_teacher(conn, id, parse_body(body)?),
            (Resource::Teachers, Verb::Delete, [id]) => delete_teacher(conn, id),

            (Resource::Enrollments, Verb::Get, []) => list_enrollments(conn),
            (Resource::Enrollments, Verb::Post, []) => {
                create_enrollment(conn, parse_body(body)?)
            }
            (Resource::Enrollments, Verb::Get, ["me", "boleta"]) => report_card(conn, subject),
            (Resource::Enrollments, Verb::Get, [id]) => get_enrollment(conn, id),
            (Resource::Enrollments, Verb::Put, [id]) => {
                update_enrollment(conn, id, parse_body(body)?)
            }
            (Resource::Enrollments, Verb::Delete, [id]) => delete_enrollment(conn, id),

            (_, _, [] | [_]) => Err(Rejection::new(
                405,
                format!("Método {} no soportado en {path}", verb.as_str()),
            )),
            _ => Err(not_found(format!("Recurso no encontrado: {path}"))),
        }
    }
}

impl Backend for LocalBackend {
    fn call(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ClientError::unreachable("local store lock poisoned"))?;
        match self.route(&conn, verb, path, body) {
            Ok(v) => {
                tracing::debug!(verb = verb.as_str(), path, "local backend ok");
                Ok(v)
            }
            Err(e) => {
                let (status, message) = match e.downcast_ref::<Rejection>() {
                    Some(r) => (r.status, r.message.clone()),
                    None => {
                        tracing::error!(verb = verb.as_str(), path, error = %format!("{e:#}"), "local backend failure");
                        (500, format!("{e:#}"))
                    }
                };
                let body = json!({
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "status": status,
                    "error": reason(status),
                    "message": message,
                    "path": format!("/api{path}"),
                });
                Err(ClientError::from_error_body(status, &body.to_string()))
            }
        }
    }
}

fn authority(resource: Resource) -> &'static str {
    match resource {
        Resource::Students => "ALUMNOS",
        Resource::Subjects => "MATERIAS",
        Resource::Teachers => "DOCENTES",
        Resource::Enrollments => "ALUMNO_MATERIAS",
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    conn.execute(
        "CREATE TABLE alumnos(
            id_alumno TEXT PRIMARY KEY,
            auth0_id TEXT,
            nombres TEXT NOT NULL,
            apellidos TEXT NOT NULL,
            fecha_ingreso TEXT NOT NULL,
            direccion TEXT NOT NULL,
            telefono TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_alumnos_auth0 ON alumnos(auth0_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE materias(
            id_materia TEXT PRIMARY KEY,
            nombre_materia TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE docentes(
            id_docente TEXT PRIMARY KEY,
            nombres TEXT NOT NULL,
            apellidos TEXT NOT NULL,
            fecha_ingreso TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE alumno_materias(
            id TEXT PRIMARY KEY,
            id_alumno TEXT NOT NULL,
            id_materia TEXT NOT NULL,
            id_docente TEXT NOT NULL,
            ciclo TEXT NOT NULL,
            nota_final REAL NOT NULL,
            FOREIGN KEY(id_alumno) REFERENCES alumnos(id_alumno),
            FOREIGN KEY(id_materia) REFERENCES materias(id_materia),
            FOREIGN KEY(id_docente) REFERENCES docentes(id_docente)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_alumno_materias_alumno ON alumno_materias(id_alumno)",
        [],
    )?;
    Ok(())
}

fn parse_body<T: DeserializeOwned>(body: Option<&serde_json::Value>) -> anyhow::Result<T> {
    let Some(b) = body else {
        return Err(bad_request("Cuerpo de la solicitud requerido"));
    };
    serde_json::from_value(b.clone()).map_err(|e| bad_request(format!("Solicitud inválida: {e}")))
}

fn to_json<T: serde::Serialize>(v: &T) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(v).context("failed to encode response")
}

fn blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

fn trimmed(v: &Option<String>) -> String {
    v.as_deref().unwrap_or_default().trim().to_string()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Required, ISO formatted and not after today.
fn past_date(raw: &Option<String>) -> anyhow::Result<NaiveDate> {
    if blank(raw) {
        return Err(bad_request("La fecha de ingreso es obligatoria"));
    }
    let date = NaiveDate::parse_from_str(&trimmed(raw), "%Y-%m-%d")
        .map_err(|_| bad_request("La fecha de ingreso debe tener formato AAAA-MM-DD"))?;
    if date > today() {
        return Err(bad_request("La fecha de ingreso no puede ser futura"));
    }
    Ok(date)
}

const PHONE_PATTERN: &str = r"^\+?[0-9\-\s]{7,20}$";
const PERIOD_PATTERN: &str = r"^\d{4}-[12]$";

fn matches(pattern: &str, value: &str) -> anyhow::Result<bool> {
    let re = Regex::new(pattern).with_context(|| format!("bad pattern {pattern}"))?;
    Ok(re.is_match(value))
}

// ---------------------------------------------------------------------------
// alumnos

#[derive(Debug, Deserialize)]
struct StudentBody {
    nombres: Option<String>,
    apellidos: Option<String>,
    #[serde(rename = "fechaIngreso")]
    fecha_ingreso: Option<String>,
    direccion: Option<String>,
    telefono: Option<String>,
}

struct ValidStudent {
    nombres: String,
    apellidos: String,
    fecha_ingreso: NaiveDate,
    direccion: String,
    telefono: String,
}

fn validate_student(b: &StudentBody) -> anyhow::Result<ValidStudent> {
    if blank(&b.nombres) {
        return Err(bad_request("El campo 'nombres' es obligatorio"));
    }
    if blank(&b.apellidos) {
        return Err(bad_request("El campo 'apellidos' es obligatorio"));
    }
    let nombres = trimmed(&b.nombres);
    let apellidos = trimmed(&b.apellidos);
    if nombres.chars().count() > NAME_MAX || apellidos.chars().count() > NAME_MAX {
        return Err(bad_request(
            "Los nombres o apellidos no pueden superar 100 caracteres",
        ));
    }
    let fecha_ingreso = past_date(&b.fecha_ingreso)?;
    if blank(&b.direccion) {
        return Err(bad_request("La dirección es obligatoria"));
    }
    let direccion = trimmed(&b.direccion);
    if direccion.chars().count() > ADDRESS_MAX {
        return Err(bad_request("La dirección no puede superar 255 caracteres"));
    }
    if blank(&b.telefono) {
        return Err(bad_request("El teléfono es obligatorio"));
    }
    let telefono = trimmed(&b.telefono);
    if !matches(PHONE_PATTERN, &telefono)? {
        return Err(bad_request("El teléfono tiene un formato inválido"));
    }
    Ok(ValidStudent {
        nombres,
        apellidos,
        fecha_ingreso,
        direccion,
        telefono,
    })
}

fn student_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        first_names: row.get(1)?,
        last_names: row.get(2)?,
        enrollment_date: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
    })
}

const STUDENT_COLUMNS: &str =
    "id_alumno, nombres, apellidos, fecha_ingreso, direccion, telefono";

fn find_student(conn: &Connection, id: &str) -> anyhow::Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM alumnos WHERE id_alumno = ?"),
        [id],
        student_from_row,
    )
    .optional()
    .context("student lookup failed")
}

fn student_exists_with(
    conn: &Connection,
    v: &ValidStudent,
    except_id: Option<&str>,
) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM alumnos
             WHERE nombres = ? AND apellidos = ? AND fecha_ingreso = ?
               AND id_alumno <> COALESCE(?, '')
             LIMIT 1",
            params![v.nombres, v.apellidos, v.fecha_ingreso.to_string(), except_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn list_students(conn: &Connection) -> anyhow::Result<serde_json::Value> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDENT_COLUMNS} FROM alumnos ORDER BY rowid"
    ))?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    to_json(&rows)
}

fn get_student(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    match find_student(conn, id)? {
        Some(s) => to_json(&s),
        None => Err(not_found(format!("Alumno no encontrado: {id}"))),
    }
}

fn student_me(conn: &Connection, subject: Option<&str>) -> anyhow::Result<serde_json::Value> {
    let sub = subject.unwrap_or_default();
    let found = conn
        .query_row(
            &format!(
                "SELECT {STUDENT_COLUMNS} FROM alumnos WHERE auth0_id = ? ORDER BY rowid LIMIT 1"
            ),
            [sub],
            student_from_row,
        )
        .optional()?;
    match found {
        Some(s) => to_json(&s),
        None => Err(not_found(format!(
            "Alumno no encontrado para Auth0 ID: {sub}"
        ))),
    }
}

fn create_student(
    conn: &Connection,
    body: StudentBody,
    subject: Option<&str>,
) -> anyhow::Result<serde_json::Value> {
    let v = validate_student(&body)?;
    if student_exists_with(conn, &v, None)? {
        return Err(conflict("Ya existe un alumno con los mismos datos"));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO alumnos(id_alumno, auth0_id, nombres, apellidos, fecha_ingreso, direccion, telefono)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            subject,
            v.nombres,
            v.apellidos,
            v.fecha_ingreso.to_string(),
            v.direccion,
            v.telefono
        ],
    )?;
    tracing::info!(%id, "student created");
    get_student(conn, &id)
}

fn update_student(
    conn: &Connection,
    id: &str,
    body: StudentBody,
) -> anyhow::Result<serde_json::Value> {
    let v = validate_student(&body)?;
    let Some(current) = find_student(conn, id)? else {
        return Err(not_found(format!("Alumno no encontrado: {id}")));
    };
    let key_changed = !current.first_names.eq_ignore_ascii_case(&v.nombres)
        || !current.last_names.eq_ignore_ascii_case(&v.apellidos)
        || current.enrollment_date != v.fecha_ingreso.to_string();
    if key_changed && student_exists_with(conn, &v, Some(id))? {
        return Err(conflict("Otro alumno ya tiene esos mismos datos"));
    }
    conn.execute(
        "UPDATE alumnos
         SET nombres = ?, apellidos = ?, fecha_ingreso = ?, direccion = ?, telefono = ?
         WHERE id_alumno = ?",
        params![
            v.nombres,
            v.apellidos,
            v.fecha_ingreso.to_string(),
            v.direccion,
            v.telefono,
            id
        ],
    )?;
    get_student(conn, id)
}

fn delete_student(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    if find_student(conn, id)?.is_none() {
        return Err(not_found(format!("Alumno no encontrado: {id}")));
    }
    let tx = conn.unchecked_transaction()?;
    // Enrollments belong to the student and go with it.
    tx.execute("DELETE FROM alumno_materias WHERE id_alumno = ?", [id])?;
    tx.execute("DELETE FROM alumnos WHERE id_alumno = ?", [id])?;
    tx.commit()?;
    Ok(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// materias

#[derive(Debug, Deserialize)]
struct SubjectBody {
    #[serde(rename = "nombreMateria")]
    nombre_materia: Option<String>,
}

fn validate_subject(b: &SubjectBody) -> anyhow::Result<String> {
    if blank(&b.nombre_materia) {
        return Err(bad_request("El campo 'nombreMateria' es obligatorio"));
    }
    let name = trimmed(&b.nombre_materia);
    let len = name.chars().count();
    if !(SUBJECT_NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(bad_request(
            "El nombre de la materia debe tener entre 3 y 100 caracteres",
        ));
    }
    Ok(name)
}

fn subjects(conn: &Connection) -> anyhow::Result<Vec<Subject>> {
    let mut stmt = conn.prepare("SELECT id_materia, nombre_materia FROM materias ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Subject {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive on the full Unicode name, unlike SQLite's NOCASE.
fn subject_name_taken(conn: &Connection, name: &str, except_id: Option<&str>) -> anyhow::Result<bool> {
    let wanted = name.to_lowercase();
    Ok(subjects(conn)?
        .iter()
        .any(|m| Some(m.id.as_str()) != except_id && m.name.to_lowercase() == wanted))
}

fn find_subject(conn: &Connection, id: &str) -> anyhow::Result<Option<Subject>> {
    conn.query_row(
        "SELECT id_materia, nombre_materia FROM materias WHERE id_materia = ?",
        [id],
        |r| {
            Ok(Subject {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()
    .context("subject lookup failed")
}

fn list_subjects(conn: &Connection) -> anyhow::Result<serde_json::Value> {
    to_json(&subjects(conn)?)
}

fn get_subject(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    match find_subject(conn, id)? {
        Some(m) => to_json(&m),
        None => Err(not_found(format!("Materia no encontrada: {id}"))),
    }
}

fn create_subject(conn: &Connection, body: SubjectBody) -> anyhow::Result<serde_json::Value> {
    let name = validate_subject(&body)?;
    if subject_name_taken(conn, &name, None)? {
        return Err(conflict(format!(
            "Ya existe una materia con el nombre '{name}'"
        )));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO materias(id_materia, nombre_materia) VALUES(?, ?)",
        params![id, name],
    )?;
    tracing::info!(%id, "subject created");
    get_subject(conn, &id)
}

fn update_subject(
    conn: &Connection,
    id: &str,
    body: SubjectBody,
) -> anyhow::Result<serde_json::Value> {
    let name = validate_subject(&body)?;
    if find_subject(conn, id)?.is_none() {
        return Err(not_found(format!("Materia no encontrada: {id}")));
    }
    if subject_name_taken(conn, &name, Some(id))? {
        return Err(conflict(format!("Otra materia ya usa el nombre '{name}'")));
    }
    conn.execute(
        "UPDATE materias SET nombre_materia = ? WHERE id_materia = ?",
        params![name, id],
    )?;
    get_subject(conn, id)
}

fn referenced_by_enrollments(conn: &Connection, column: &str, id: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM alumno_materias WHERE {column} = ? LIMIT 1"),
            [id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn delete_subject(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    if find_subject(conn, id)?.is_none() {
        return Err(not_found(format!("Materia no encontrada: {id}")));
    }
    if referenced_by_enrollments(conn, "id_materia", id)? {
        return Err(conflict("La materia tiene inscripciones asociadas"));
    }
    conn.execute("DELETE FROM materias WHERE id_materia = ?", [id])?;
    Ok(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// docentes

#[derive(Debug, Deserialize)]
struct TeacherBody {
    nombres: Option<String>,
    apellidos: Option<String>,
    #[serde(rename = "fechaIngreso")]
    fecha_ingreso: Option<String>,
}

fn validate_teacher(b: &TeacherBody) -> anyhow::Result<(String, String, NaiveDate)> {
    if blank(&b.nombres) {
        return Err(bad_request("El campo 'nombres' es obligatorio"));
    }
    if blank(&b.apellidos) {
        return Err(bad_request("El campo 'apellidos' es obligatorio"));
    }
    let nombres = trimmed(&b.nombres);
    let apellidos = trimmed(&b.apellidos);
    if nombres.chars().count() > NAME_MAX || apellidos.chars().count() > NAME_MAX {
        return Err(bad_request(
            "Los nombres o apellidos no pueden superar 100 caracteres",
        ));
    }
    let fecha = past_date(&b.fecha_ingreso)?;
    Ok((nombres, apellidos, fecha))
}

fn find_teacher(conn: &Connection, id: &str) -> anyhow::Result<Option<Teacher>> {
    conn.query_row(
        "SELECT id_docente, nombres, apellidos, fecha_ingreso FROM docentes WHERE id_docente = ?",
        [id],
        |r| {
            Ok(Teacher {
                id: r.get(0)?,
                first_names: r.get(1)?,
                last_names: r.get(2)?,
                hire_date: r.get(3)?,
            })
        },
    )
    .optional()
    .context("teacher lookup failed")
}

fn teacher_exists_with(
    conn: &Connection,
    key: &(String, String, NaiveDate),
    except_id: Option<&str>,
) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM docentes
             WHERE nombres = ? AND apellidos = ? AND fecha_ingreso = ?
               AND id_docente <> COALESCE(?, '')
             LIMIT 1",
            params![key.0, key.1, key.2.to_string(), except_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn list_teachers(conn: &Connection) -> anyhow::Result<serde_json::Value> {
    let mut stmt = conn.prepare(
        "SELECT id_docente, nombres, apellidos, fecha_ingreso FROM docentes ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Teacher {
                id: r.get(0)?,
                first_names: r.get(1)?,
                last_names: r.get(2)?,
                hire_date: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    to_json(&rows)
}

fn get_teacher(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    match find_teacher(conn, id)? {
        Some(d) => to_json(&d),
        None => Err(not_found(format!("Docente no encontrado: {id}"))),
    }
}

fn create_teacher(conn: &Connection, body: TeacherBody) -> anyhow::Result<serde_json::Value> {
    let key = validate_teacher(&body)?;
    if teacher_exists_with(conn, &key, None)? {
        return Err(conflict("Ya existe un docente con los mismos datos"));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO docentes(id_docente, nombres, apellidos, fecha_ingreso) VALUES(?, ?, ?, ?)",
        params![id, key.0, key.1, key.2.to_string()],
    )?;
    tracing::info!(%id, "teacher created");
    get_teacher(conn, &id)
}

fn update_teacher(
    conn: &Connection,
    id: &str,
    body: TeacherBody,
) -> anyhow::Result<serde_json::Value> {
    let key = validate_teacher(&body)?;
    let Some(current) = find_teacher(conn, id)? else {
        return Err(not_found(format!("Docente no encontrado: {id}")));
    };
    let key_changed = !current.first_names.eq_ignore_ascii_case(&key.0)
        || !current.last_names.eq_ignore_ascii_case(&key.1)
        || current.hire_date != key.2.to_string();
    if key_changed && teacher_exists_with(conn, &key, Some(id))? {
        return Err(conflict("Otro docente ya posee esos mismos datos"));
    }
    conn.execute(
        "UPDATE docentes SET nombres = ?, apellidos = ?, fecha_ingreso = ? WHERE id_docente = ?",
        params![key.0, key.1, key.2.to_string(), id],
    )?;
    get_teacher(conn, id)
}

fn delete_teacher(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    if find_teacher(conn, id)?.is_none() {
        return Err(not_found(format!("Docente no encontrado: {id}")));
    }
    if referenced_by_enrollments(conn, "id_docente", id)? {
        return Err(conflict("El docente tiene inscripciones asociadas"));
    }
    conn.execute("DELETE FROM docentes WHERE id_docente = ?", [id])?;
    Ok(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// alumno-materias

#[derive(Debug, Deserialize)]
struct EnrollmentBody {
    #[serde(rename = "alumnoId")]
    alumno_id: Option<String>,
    #[serde(rename = "materiaId")]
    materia_id: Option<String>,
    #[serde(rename = "docenteId")]
    docente_id: Option<String>,
    ciclo: Option<String>,
    #[serde(rename = "notaFinal")]
    nota_final: Option<f64>,
}

struct ValidEnrollment {
    alumno_id: String,
    materia_id: String,
    docente_id: String,
    ciclo: String,
    nota_final: f64,
}

fn validate_enrollment(b: &EnrollmentBody) -> anyhow::Result<ValidEnrollment> {
    if blank(&b.alumno_id) {
        return Err(bad_request("El alumnoId es obligatorio"));
    }
    if blank(&b.materia_id) {
        return Err(bad_request("El materiaId es obligatorio"));
    }
    if blank(&b.docente_id) {
        return Err(bad_request("El docenteId es obligatorio"));
    }
    if blank(&b.ciclo) {
        return Err(bad_request("El ciclo es obligatorio"));
    }
    let ciclo = trimmed(&b.ciclo);
    if !matches(PERIOD_PATTERN, &ciclo)? {
        return Err(bad_request("El ciclo debe tener formato YYYY-1 o YYYY-2"));
    }
    let Some(nota_final) = b.nota_final else {
        return Err(bad_request("La nota final es obligatoria"));
    };
    if !(0.0..=BACKEND_GRADE_MAX).contains(&nota_final) {
        return Err(bad_request("La nota final debe estar entre 0 y 100"));
    }
    Ok(ValidEnrollment {
        alumno_id: trimmed(&b.alumno_id),
        materia_id: trimmed(&b.materia_id),
        docente_id: trimmed(&b.docente_id),
        ciclo,
        nota_final,
    })
}

fn ensure_references(conn: &Connection, v: &ValidEnrollment) -> anyhow::Result<()> {
    if find_student(conn, &v.alumno_id)?.is_none() {
        return Err(not_found(format!("Alumno no encontrado: {}", v.alumno_id)));
    }
    if find_subject(conn, &v.materia_id)?.is_none() {
        return Err(not_found(format!("Materia no encontrada: {}", v.materia_id)));
    }
    if find_teacher(conn, &v.docente_id)?.is_none() {
        return Err(not_found(format!("Docente no encontrado: {}", v.docente_id)));
    }
    Ok(())
}

const ENROLLMENT_COLUMNS: &str = "id, id_alumno, id_materia, id_docente, ciclo, nota_final";

fn enrollment_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<EnrollmentRecord> {
    Ok(EnrollmentRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        subject_id: r.get(2)?,
        teacher_id: r.get(3)?,
        period: r.get(4)?,
        grade: r.get(5)?,
    })
}

fn find_enrollment(conn: &Connection, id: &str) -> anyhow::Result<Option<EnrollmentRecord>> {
    conn.query_row(
        &format!("SELECT {ENROLLMENT_COLUMNS} FROM alumno_materias WHERE id = ?"),
        [id],
        enrollment_from_row,
    )
    .optional()
    .context("enrollment lookup failed")
}

fn enrollment_key_taken(conn: &Connection, v: &ValidEnrollment) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM alumno_materias
             WHERE id_alumno = ? AND id_materia = ? AND ciclo = ?
             LIMIT 1",
            params![v.alumno_id, v.materia_id, v.ciclo],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn list_enrollments(conn: &Connection) -> anyhow::Result<serde_json::Value> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM alumno_materias ORDER BY rowid"
    ))?;
    let rows = stmt
        .query_map([], enrollment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    to_json(&rows)
}

fn get_enrollment(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    match find_enrollment(conn, id)? {
        Some(e) => to_json(&e),
        None => Err(not_found(format!("Inscripción no encontrada: {id}"))),
    }
}

fn create_enrollment(conn: &Connection, body: EnrollmentBody) -> anyhow::Result<serde_json::Value> {
    let v = validate_enrollment(&body)?;
    ensure_references(conn, &v)?;
    if enrollment_key_taken(conn, &v)? {
        return Err(conflict(
            "Ya existe una inscripción para este alumno, materia y ciclo",
        ));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO alumno_materias(id, id_alumno, id_materia, id_docente, ciclo, nota_final)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![id, v.alumno_id, v.materia_id, v.docente_id, v.ciclo, v.nota_final],
    )?;
    tracing::info!(%id, "enrollment created");
    get_enrollment(conn, &id)
}

fn update_enrollment(
    conn: &Connection,
    id: &str,
    body: EnrollmentBody,
) -> anyhow::Result<serde_json::Value> {
    let v = validate_enrollment(&body)?;
    let Some(current) = find_enrollment(conn, id)? else {
        return Err(not_found(format!("Inscripción no encontrada: {id}")));
    };
    ensure_references(conn, &v)?;
    let key_changed = current.student_id != v.alumno_id
        || current.subject_id != v.materia_id
        || current.period != v.ciclo;
    if key_changed && enrollment_key_taken(conn, &v)? {
        return Err(conflict(
            "Otra inscripción ya usa el mismo alumno, materia y ciclo",
        ));
    }
    conn.execute(
        "UPDATE alumno_materias
         SET id_alumno = ?, id_materia = ?, id_docente = ?, ciclo = ?, nota_final = ?
         WHERE id = ?",
        params![v.alumno_id, v.materia_id, v.docente_id, v.ciclo, v.nota_final, id],
    )?;
    get_enrollment(conn, id)
}

fn delete_enrollment(conn: &Connection, id: &str) -> anyhow::Result<serde_json::Value> {
    let n = conn.execute("DELETE FROM alumno_materias WHERE id = ?", [id])?;
    if n == 0 {
        return Err(not_found(format!("Inscripción no encontrada: {id}")));
    }
    Ok(serde_json::Value::Null)
}

fn report_card(conn: &Connection, subject: Option<&str>) -> anyhow::Result<serde_json::Value> {
    let Some(sub) = subject else {
        return Ok(json!([]));
    };
    let mut stmt = conn.prepare(
        "SELECT am.id, m.nombre_materia, am.nota_final
         FROM alumno_materias am
         JOIN alumnos a ON a.id_alumno = am.id_alumno
         JOIN materias m ON m.id_materia = am.id_materia
         WHERE a.auth0_id = ?
         ORDER BY am.rowid",
    )?;
    let rows = stmt
        .query_map([sub], |r| {
            Ok(ReportCardLine {
                id: r.get(0)?,
                subject_name: r.get(1)?,
                grade: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    to_json(&rows)
}

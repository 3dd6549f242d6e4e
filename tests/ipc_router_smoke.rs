use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

const ROLES_CLAIM: &str = "https://fullstackauth.com/roles";

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_registrod");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn registrod");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send_line(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, raw: &str) -> serde_json::Value {
    writeln!(stdin, "{}", raw).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", raw);
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["configured"], false);

    let early = request(&mut stdin, &mut reader, "2", "enrollments.load", json!({}));
    assert_eq!(error_code(&early), Some("not_configured"));

    let info = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.configure",
        json!({
            "backend": "local",
            "claims": { "sub": "auth0|all", ROLES_CLAIM: ["alumno", "profesor", "registroAcademico"] }
        }),
    );
    assert_eq!(info["result"]["backend"], "local");
    assert_eq!(info["result"]["roles"].as_array().map(|a| a.len()), Some(3));

    let mut n = 10;
    for family in ["enrollments", "grades", "students", "subjects", "teachers"] {
        for action in ["load", "snapshot", "cancelEdit", "delete.cancel"] {
            n += 1;
            let resp = request(
                &mut stdin,
                &mut reader,
                &n.to_string(),
                &format!("{family}.{action}"),
                json!({}),
            );
            assert_eq!(resp["ok"], true, "{family}.{action}: {resp}");
        }
        n += 1;
        let resp = request(
            &mut stdin,
            &mut reader,
            &n.to_string(),
            &format!("{family}.edit"),
            json!({}),
        );
        assert_eq!(error_code(&resp), Some("bad_params"));
        n += 1;
        let resp = request(
            &mut stdin,
            &mut reader,
            &n.to_string(),
            &format!("{family}.delete.confirm"),
            json!({}),
        );
        assert_eq!(error_code(&resp), Some("no_pending_delete"));
    }

    let _ = request(&mut stdin, &mut reader, "90", "grades.years", json!({}));
    let _ = request(&mut stdin, &mut reader, "91", "reportCard.load", json!({}));
    let _ = request(&mut stdin, &mut reader, "92", "profile.load", json!({}));
    let _ = request(&mut stdin, &mut reader, "93", "session.info", json!({}));
    let nav = request(&mut stdin, &mut reader, "94", "nav.items", json!({}));
    assert_eq!(nav["result"]["items"].as_array().map(|a| a.len()), Some(5));

    let unknown = send_line(
        &mut stdin,
        &mut reader,
        &json!({ "id": "95", "method": "grades.export", "params": {} }).to_string(),
    );
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let garbage = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(garbage["ok"], false);
    assert_eq!(error_code(&garbage), Some("bad_json"));

    let bad_backend = request(
        &mut stdin,
        &mut reader,
        "96",
        "session.configure",
        json!({ "backend": "ftp" }),
    );
    assert_eq!(error_code(&bad_backend), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn each_family_checks_its_role() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "backend": "local", "claims": { ROLES_CLAIM: ["profesor"] } }),
    );

    let nav = request(&mut stdin, &mut reader, "2", "nav.items", json!({}));
    let labels: Vec<&str> = nav["result"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|i| i["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["Dashboard", "Calificaciones"]);

    let grades = request(&mut stdin, &mut reader, "3", "grades.load", json!({}));
    assert_eq!(grades["ok"], true);
    assert_eq!(grades["result"]["variant"], "grades");

    for (i, method) in [
        "enrollments.load",
        "students.load",
        "subjects.snapshot",
        "teachers.load",
        "reportCard.load",
        "profile.load",
    ]
    .iter()
    .enumerate()
    {
        let resp = request(&mut stdin, &mut reader, &format!("4-{i}"), method, json!({}));
        assert_eq!(error_code(&resp), Some("forbidden"), "{method}");
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn local_backend_enforces_claimed_permissions() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({
            "backend": "local",
            "claims": {
                ROLES_CLAIM: ["registroAcademico"],
                "permissions": ["read:materias"]
            }
        }),
    );

    let listed = request(&mut stdin, &mut reader, "2", "subjects.load", json!({}));
    assert_eq!(listed["ok"], true);

    let denied = request(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.submit",
        json!({ "form": { "nombreMateria": "Química" } }),
    );
    assert_eq!(error_code(&denied), Some("transport_error"));
    assert_eq!(denied["error"]["details"]["status"], 403);

    let students = request(&mut stdin, &mut reader, "4", "students.load", json!({}));
    assert_eq!(error_code(&students), Some("transport_error"));
    assert_eq!(students["error"]["message"], "No se pudieron cargar los alumnos.");

    drop(stdin);
    let _ = child.wait();
}

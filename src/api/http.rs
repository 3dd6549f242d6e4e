use super::auth::TokenProvider;
use super::{Backend, Verb};
use crate::error::{ClientError, ClientResult};
use anyhow::Context;
use reqwest::blocking::Client;
use std::time::Duration;

pub struct HttpBackend {
    client: Client,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Box<dyn TokenProvider>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(HttpBackend {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Backend for HttpBackend {
    fn call(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        let token = self.tokens.access_token()?;
        let url = self.url(path);
        let mut req = match verb {
            Verb::Get => self.client.get(&url),
            Verb::Post => self.client.post(&url),
            Verb::Put => self.client.put(&url),
            Verb::Delete => self.client.delete(&url),
        }
        .bearer_auth(token);
        if let Some(b) = body {
            req = req.json(b);
        }

        tracing::debug!(verb = verb.as_str(), %url, "backend request");
        let resp = req.send().map_err(ClientError::unreachable)?;
        let status = resp.status();
        let text = resp.text().map_err(ClientError::unreachable)?;

        if !status.is_success() {
            tracing::info!(verb = verb.as_str(), %url, status = status.as_u16(), "backend rejected request");
            return Err(ClientError::from_error_body(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(%url, error = %e, "backend returned non-json body");
            ClientError::Transport {
                status: Some(status.as_u16()),
                message: format!("Respuesta inválida de {path}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::StaticToken;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accepts one connection, captures the request head and body, and
    /// answers with the canned status and body.
    fn one_shot_server(status_line: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let status_line = status_line.to_string();
        let body = body.to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
                head.push_str(&line);
            }
            let mut req_body = vec![0u8; content_length];
            reader.read_exact(&mut req_body).expect("read body");
            head.push_str(&String::from_utf8_lossy(&req_body));

            let resp = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(resp.as_bytes()).expect("write");
            head
        });
        (format!("http://{addr}/api"), handle)
    }

    fn backend(base: &str, token: Option<&str>) -> HttpBackend {
        HttpBackend::new(
            base,
            Duration::from_secs(5),
            Box::new(StaticToken::new(token.map(|t| t.to_string()))),
        )
        .expect("backend")
    }

    #[test]
    fn sends_bearer_token_and_json_body() {
        let (base, server) = one_shot_server("201 Created", r#"{"id":"e9"}"#);
        let b = backend(&base, Some("tok-123"));
        let out = b
            .call(Verb::Post, "/alumno-materias", Some(&json!({ "ciclo": "2024-1" })))
            .expect("created");
        assert_eq!(out["id"], "e9");

        let seen = server.join().expect("server");
        assert!(seen.starts_with("POST /api/alumno-materias HTTP/1.1"));
        assert!(seen.to_ascii_lowercase().contains("authorization: bearer tok-123"));
        assert!(seen.contains(r#""ciclo":"2024-1""#));
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let (base, server) = one_shot_server(
            "409 Conflict",
            r#"{"status":409,"error":"Conflict","message":"Ya existe una materia con el nombre 'Física'"}"#,
        );
        let b = backend(&base, Some("tok"));
        let err = b.call(Verb::Get, "/materias", None).expect_err("conflict");
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.user_message(), "Ya existe una materia con el nombre 'Física'");
        server.join().expect("server");
    }

    #[test]
    fn empty_success_body_is_null() {
        let (base, server) = one_shot_server("200 OK", "");
        let b = backend(&base, Some("tok"));
        let out = b.call(Verb::Delete, "/alumnos/s1", None).expect("deleted");
        assert!(out.is_null());
        server.join().expect("server");
    }

    #[test]
    fn missing_token_fails_before_any_request() {
        let b = backend("http://127.0.0.1:9/api", None);
        let err = b.call(Verb::Get, "/alumnos", None).expect_err("auth");
        assert_eq!(err.code(), "auth_error");
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request routing. Each endpoint deserialises its JSON body, checks the
// target exists, then runs the pipeline on the blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use pdfcheck_core::VerifierConfig;
use pdfcheck_verify::Verifier;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::http::{Request, Response};

pub const VERIFY_FILE: &str = "/api/verify/file";
pub const VERIFY_BLOB: &str = "/api/verify/blob";
pub const VERIFY_DIRECTORY: &str = "/api/verify/directory";

/// Paths used by earlier deployments of the service.
const LEGACY_VERIFY_FILE: &str = "/api/verificar_archivo";
const LEGACY_VERIFY_BLOB: &str = "/api/verifica_base64";
const LEGACY_VERIFY_DIRECTORY: &str = "/api/verifica_directorio";

const INDEX: &str = "\
pdfcheck: verificacion y normalizacion de PDF

POST /api/verify/file       {\"file_path\": \"<ruta>\"}
POST /api/verify/blob       {\"data\": \"<base64>\"}
POST /api/verify/directory  {\"directory_path\": \"<ruta>\"}
";

#[derive(Debug, Deserialize)]
struct FileRequest {
    #[serde(alias = "archivo")]
    file_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BlobRequest {
    #[serde(alias = "base64")]
    data: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryRequest {
    #[serde(alias = "directorio")]
    directory_path: PathBuf,
}

enum Endpoint {
    Index,
    File,
    Blob,
    Directory,
}

fn endpoint(path: &str) -> Option<Endpoint> {
    match path {
        "/" => Some(Endpoint::Index),
        VERIFY_FILE | LEGACY_VERIFY_FILE => Some(Endpoint::File),
        VERIFY_BLOB | LEGACY_VERIFY_BLOB => Some(Endpoint::Blob),
        VERIFY_DIRECTORY | LEGACY_VERIFY_DIRECTORY => Some(Endpoint::Directory),
        _ => None,
    }
}

/// Dispatch one request to its handler.
pub async fn route(request: Request, config: Arc<VerifierConfig>) -> Response {
    let Some(endpoint) = endpoint(&request.path) else {
        return Response::error(404, &format!("Ruta no encontrada: {}", request.path));
    };

    match (endpoint, request.method.as_str()) {
        (Endpoint::Index, "GET") => Response::text(200, INDEX),
        (Endpoint::File, "POST") => verify_file(&request.body, config).await,
        (Endpoint::Blob, "POST") => verify_blob(&request.body, config).await,
        (Endpoint::Directory, "POST") => verify_directory(&request.body, config).await,
        _ => Response::error(405, &format!("Metodo no permitido: {}", request.method)),
    }
}

async fn verify_file(body: &[u8], config: Arc<VerifierConfig>) -> Response {
    let request: FileRequest = match parse_body(body, "Se requiere la ruta del archivo") {
        Ok(request) => request,
        Err(response) => return response,
    };
    let path = request.file_path;
    if !path.exists() {
        return Response::error(404, &format!("El archivo {} no existe", path.display()));
    }

    run_blocking(move || {
        let result = Verifier::new(config).verify_path(&path);
        Response::json(200, &result)
    })
    .await
}

async fn verify_blob(body: &[u8], config: Arc<VerifierConfig>) -> Response {
    let request: BlobRequest = match parse_body(body, "Se requiere un string base64") {
        Ok(request) => request,
        Err(response) => return response,
    };

    run_blocking(move || {
        let result = Verifier::new(config).verify_blob(&request.data);
        Response::json(200, &result)
    })
    .await
}

async fn verify_directory(body: &[u8], config: Arc<VerifierConfig>) -> Response {
    let request: DirectoryRequest = match parse_body(body, "Se requiere la ruta del directorio")
    {
        Ok(request) => request,
        Err(response) => return response,
    };
    let dir = request.directory_path;
    if !dir.is_dir() {
        return Response::error(
            404,
            &format!("El directorio {} no existe o es invalido", dir.display()),
        );
    }

    run_blocking(move || match Verifier::new(config).scan_directory(&dir) {
        Ok(report) => Response::json(200, &report),
        Err(err) => Response::error(500, &err.to_string()),
    })
    .await
}

/// Deserialise a JSON body. A missing or mistyped field answers with
/// `missing_field`; unparseable JSON answers with the parser's message.
fn parse_body<T: DeserializeOwned>(body: &[u8], missing_field: &str) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "rejecting request body");
        if err.is_data() {
            Response::error(400, missing_field)
        } else {
            Response::error(400, &format!("JSON invalido: {err}"))
        }
    })
}

async fn run_blocking<F>(job: F) -> Response
where
    F: FnOnce() -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "verification task failed");
            Response::error(500, &format!("Error inesperado: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfcheck_document::fixtures;
    use serde_json::Value;

    struct Fixture {
        dir: tempfile::TempDir,
        config: Arc<VerifierConfig>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(VerifierConfig {
            image_dir: dir.path().join("images"),
            staging_dir: Some(dir.path().join("staging")),
            ..VerifierConfig::default()
        });
        Fixture { dir, config }
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    fn post(path: &str, json: Value) -> Request {
        Request::new("POST", path, json.to_string())
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let fx = fixture();
        let response = route(Request::new("GET", "/", ""), fx.config).await;
        assert_eq!(response.status, 200);
        let text = String::from_utf8(response.body).unwrap();
        assert!(text.contains(VERIFY_FILE) && text.contains(VERIFY_DIRECTORY));
    }

    #[tokio::test]
    async fn verifies_file_by_path() {
        let fx = fixture();
        let path = fx.dir.path().join("doc.pdf");
        std::fs::write(&path, fixtures::text_pdf(&["hola"])).unwrap();

        let response = route(
            post(VERIFY_FILE, serde_json::json!({ "file_path": path })),
            fx.config,
        )
        .await;
        assert_eq!(response.status, 200);
        let json = body(&response);
        assert_eq!(json["is_valid"], true);
        assert_eq!(json["message"], "PDF valido.");
        assert_eq!(json["images"], serde_json::json!([]));
        assert!(json.get("replaced").is_none());
    }

    #[tokio::test]
    async fn legacy_field_and_path_are_accepted() {
        let fx = fixture();
        let path = fx.dir.path().join("doc.pdf");
        std::fs::write(&path, fixtures::text_pdf(&["hola"])).unwrap();

        let response = route(
            post(LEGACY_VERIFY_FILE, serde_json::json!({ "archivo": path })),
            fx.config,
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(body(&response)["is_valid"], true);
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let fx = fixture();
        let response = route(
            post(VERIFY_FILE, serde_json::json!({ "file_path": "/no/such.pdf" })),
            fx.config,
        )
        .await;
        assert_eq!(response.status, 404);
        assert!(body(&response)["error"].as_str().unwrap().contains("no existe"));
    }

    #[tokio::test]
    async fn missing_field_and_bad_json_are_400() {
        let fx = fixture();
        let response = route(post(VERIFY_FILE, serde_json::json!({})), fx.config.clone()).await;
        assert_eq!(response.status, 400);
        assert_eq!(body(&response)["error"], "Se requiere la ruta del archivo");

        let response = route(Request::new("POST", VERIFY_BLOB, "{not json"), fx.config).await;
        assert_eq!(response.status, 400);
        assert!(body(&response)["error"].as_str().unwrap().starts_with("JSON invalido"));
    }

    #[tokio::test]
    async fn blob_endpoint_decodes_payload() {
        use base64::Engine;
        let fx = fixture();
        let data = base64::engine::general_purpose::STANDARD.encode(fixtures::text_pdf(&["x"]));

        let response = route(
            post(VERIFY_BLOB, serde_json::json!({ "base64": data })),
            fx.config.clone(),
        )
        .await;
        assert_eq!(body(&response)["message"], "PDF valido.");

        let response = route(
            post(VERIFY_BLOB, serde_json::json!({ "data": "" })),
            fx.config,
        )
        .await;
        assert_eq!(response.status, 200);
        let json = body(&response);
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["message"], "La cadena base64 no contiene datos.");
    }

    #[tokio::test]
    async fn directory_endpoint_reports_partition() {
        let fx = fixture();
        let docs = fx.dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("ok.pdf"), fixtures::text_pdf(&["ok"])).unwrap();
        std::fs::write(docs.join("notes.txt"), b"plain").unwrap();

        let response = route(
            post(VERIFY_DIRECTORY, serde_json::json!({ "directorio": docs })),
            fx.config.clone(),
        )
        .await;
        assert_eq!(response.status, 200);
        let json = body(&response);
        assert_eq!(json["valid_files"].as_array().unwrap().len(), 1);
        assert_eq!(json["invalid_files"][0]["file"], "notes.txt");
        assert_eq!(json["invalid_files"][0]["message"], "No es un archivo PDF.");

        let response = route(
            post(
                VERIFY_DIRECTORY,
                serde_json::json!({ "directory_path": docs.join("ok.pdf") }),
            ),
            fx.config,
        )
        .await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn unknown_route_and_wrong_method() {
        let fx = fixture();
        let response = route(Request::new("GET", "/nope", ""), fx.config.clone()).await;
        assert_eq!(response.status, 404);

        let response = route(Request::new("GET", VERIFY_FILE, ""), fx.config).await;
        assert_eq!(response.status, 405);
    }
}

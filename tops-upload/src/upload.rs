//! Загрузка одного bulk-файла.
//!
//! Цель (индекс и URL) выводится из имени файла, тело запроса - байты файла
//! как есть. Итог пишется рядом:
//! - `<unit>.response.json` - маркер успешной загрузки
//! - `<unit>.error.json`    - сырое тело ответа, если хранилище сообщило
//!   `"errors": true` или вернуло статус >= 400
//!
//! Ошибка транспорта sidecar не создаёт.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tops_core::constants::{
    BULK_CONTENT_TYPE, ERROR_SIDECAR_SUFFIX, RESPONSE_SIDECAR_SUFFIX, SUCCESS_MARKER,
};
use tops_core::naming::{UploadTarget, sidecar_path};
use tops_core::{BulkOutcome, NamingError, classify_response};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub(crate) enum UploadError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("cannot read unit {path:?}: {source}")]
    ReadUnit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot write sidecar {path:?}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ответ хранилища на bulk-запрос
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BulkResponse {
    pub(crate) status: u16,
    pub(crate) body: Vec<u8>,
}

/// Отправка тела bulk-запроса; реализация общая для всех потоков пула.
pub(crate) trait BulkTransport: Sync {
    fn post_bulk(&self, url: &str, body: Vec<u8>) -> Result<BulkResponse, UploadError>;
}

/// HTTP POST с basic auth
pub(crate) struct HttpTransport {
    client: Client,
    user: String,
    pass: String,
}

impl HttpTransport {
    /// `timeout = None` - без таймаута
    pub(crate) fn new(user: &str, pass: &str, timeout: Option<Duration>) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UploadError::Client)?;
        Ok(Self {
            client,
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }
}

impl BulkTransport for HttpTransport {
    fn post_bulk(&self, url: &str, body: Vec<u8>) -> Result<BulkResponse, UploadError> {
        let transport = |e: reqwest::Error| UploadError::Transport {
            url: url.to_string(),
            source: e.into(),
        };

        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.pass))
            .header(CONTENT_TYPE, BULK_CONTENT_TYPE)
            .body(body)
            .send()
            .map_err(transport)?;

        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(transport)?.to_vec();
        Ok(BulkResponse { status, body })
    }
}

/// Итог по одному файлу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitOutcome {
    Uploaded,
    Rejected,
}

pub(crate) fn upload_unit<T: BulkTransport + ?Sized>(
    transport: &T,
    endpoint: &str,
    index_prefix: &str,
    unit: &Path,
) -> Result<UnitOutcome, UploadError> {
    let target = UploadTarget::from_unit_path(unit)?;
    let url = target.bulk_url(endpoint, index_prefix);

    let body = fs::read(unit).map_err(|source| UploadError::ReadUnit {
        path: unit.to_path_buf(),
        source,
    })?;
    info!("uploading {} ({} bytes) to {url}", target.unit_name, body.len());

    let resp = transport.post_bulk(&url, body)?;

    let rejected =
        resp.status >= 400 || classify_response(&resp.body) == BulkOutcome::UploadedWithErrors;
    if rejected {
        write_sidecar(unit, ERROR_SIDECAR_SUFFIX, RESPONSE_SIDECAR_SUFFIX, &resp.body)?;
        warn!(
            "{} rejected (status {}), response saved to {ERROR_SIDECAR_SUFFIX}",
            target.unit_name, resp.status
        );
        Ok(UnitOutcome::Rejected)
    } else {
        write_sidecar(
            unit,
            RESPONSE_SIDECAR_SUFFIX,
            ERROR_SIDECAR_SUFFIX,
            SUCCESS_MARKER.as_bytes(),
        )?;
        info!("{} uploaded", target.unit_name);
        Ok(UnitOutcome::Uploaded)
    }
}

/// Sidecar через временный файл + rename; sidecar противоположного
/// вида от прошлых запусков удаляется.
fn write_sidecar(
    unit: &Path,
    suffix: &str,
    stale_suffix: &str,
    contents: &[u8],
) -> Result<(), UploadError> {
    let path = sidecar_path(unit, suffix);
    let tmp = sidecar_path(unit, &format!("{suffix}.tmp"));

    fs::write(&tmp, contents)
        .and_then(|()| fs::rename(&tmp, &path))
        .map_err(|source| UploadError::Sidecar {
            path: path.clone(),
            source,
        })?;

    let stale = sidecar_path(unit, stale_suffix);
    match fs::remove_file(&stale) {
        Ok(()) => debug!("removed stale {}", stale.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("cannot remove stale {}: {e}", stale.display()),
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const UNIT_BODY: &str = "{\"index\":{\"_type\":\"_doc\"}}\n{\"s\":\"AAPL\"}\n";
    const ERROR_BODY: &str = r#"{"took":1,"errors":true,"items":[{"index":{"status":400}}]}"#;

    fn unit(dir: &Path) -> PathBuf {
        let path = dir.join("20180129_IEXTP1_AAPL_0.ndjson");
        fs::write(&path, UNIT_BODY).unwrap();
        path
    }

    #[test]
    fn accepted_unit_gets_success_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = unit(dir.path());
        fs::write(sidecar_path(&path, ERROR_SIDECAR_SUFFIX), "old").unwrap();

        let t = FakeTransport::replying(200, r#"{"took":3,"errors":false,"items":[]}"#);
        let outcome = upload_unit(&t, "http://es:9200", "tops", &path).unwrap();

        assert_eq!(outcome, UnitOutcome::Uploaded);
        let requests = t.requests.lock().unwrap();
        assert_eq!(requests[0].0, "http://es:9200/tops-aapl-2018/_bulk");
        assert_eq!(requests[0].1, UNIT_BODY.as_bytes());
        assert_eq!(
            fs::read_to_string(sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX)).unwrap(),
            SUCCESS_MARKER
        );
        assert!(!sidecar_path(&path, ERROR_SIDECAR_SUFFIX).exists());
    }

    #[test]
    fn errors_true_body_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = unit(dir.path());
        fs::write(sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX), SUCCESS_MARKER).unwrap();

        let t = FakeTransport::replying(200, ERROR_BODY);
        let outcome = upload_unit(&t, "http://es:9200", "tops", &path).unwrap();

        assert_eq!(outcome, UnitOutcome::Rejected);
        assert_eq!(
            fs::read_to_string(sidecar_path(&path, ERROR_SIDECAR_SUFFIX)).unwrap(),
            ERROR_BODY
        );
        assert!(!sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX).exists());
    }

    #[test]
    fn http_error_status_is_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let path = unit(dir.path());

        let t = FakeTransport::replying(401, "unauthorized");
        assert_eq!(
            upload_unit(&t, "http://es:9200", "tops", &path).unwrap(),
            UnitOutcome::Rejected
        );
        assert_eq!(
            fs::read_to_string(sidecar_path(&path, ERROR_SIDECAR_SUFFIX)).unwrap(),
            "unauthorized"
        );
        assert!(!sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX).exists());
    }

    #[test]
    fn transport_error_leaves_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = unit(dir.path());

        let err = upload_unit(&FakeTransport::failing(), "http://es:9200", "tops", &path).unwrap_err();
        assert!(matches!(err, UploadError::Transport { .. }));
        assert!(!sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX).exists());
        assert!(!sidecar_path(&path, ERROR_SIDECAR_SUFFIX).exists());
    }

    #[test]
    fn unresolvable_name_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodate_AAPL_0.ndjson");
        fs::write(&path, UNIT_BODY).unwrap();

        let t = FakeTransport::replying(200, "{}");
        let err = upload_unit(&t, "http://es:9200", "tops", &path).unwrap_err();
        assert!(matches!(err, UploadError::Naming(NamingError::MissingDate(_))));
        assert!(t.requests.lock().unwrap().is_empty());
    }

    /// Один HTTP-запрос: строка запроса, заголовки (имена в нижнем регистре), тело.
    fn read_request(stream: &mut impl Read) -> (String, HashMap<String, String>, Vec<u8>) {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').unwrap();
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let len: usize = headers["content-length"].parse().unwrap();
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).unwrap();
        (request_line.trim_end().to_string(), headers, body)
    }

    #[test]
    fn http_transport_sends_bulk_request() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{ERROR_BODY}",
                ERROR_BODY.len()
            )
            .unwrap();
            request
        });

        let dir = tempfile::tempdir().unwrap();
        let path = unit(dir.path());
        let transport = HttpTransport::new("user", "pass", Some(Duration::from_secs(10))).unwrap();
        let outcome = upload_unit(&transport, &format!("http://{addr}"), "tops", &path).unwrap();

        let (request_line, headers, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /tops-aapl-2018/_bulk HTTP/1.1");
        assert_eq!(headers["authorization"], "Basic dXNlcjpwYXNz");
        assert_eq!(headers["content-type"], BULK_CONTENT_TYPE);
        assert_eq!(body, UNIT_BODY.as_bytes());

        assert_eq!(outcome, UnitOutcome::Rejected);
        assert_eq!(
            fs::read_to_string(sidecar_path(&path, ERROR_SIDECAR_SUFFIX)).unwrap(),
            ERROR_BODY
        );
        assert!(!sidecar_path(&path, RESPONSE_SIDECAR_SUFFIX).exists());
    }
}

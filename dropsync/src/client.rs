#![doc = "HTTP client for the remote content store: metadata lookups, uploads and downloads."]
//
//! # Remote client
//!
//! [`DropboxClient`] implements the core's [`RemoteMetadataReader`] and
//! [`TransferExecutor`] against the store's v2 HTTP API.
//!
//! - RPC endpoints (`files/get_metadata`) take a JSON body on the API host.
//! - Content endpoints (`files/upload`, `files/download`, upload sessions)
//!   take their arguments as JSON in the `Dropbox-API-Arg` header, which
//!   must be ASCII, see [`header_arg`].
//! - Errors come back as HTTP 409 with an `error_summary` such as
//!   `path/not_found/..`. Only that case maps to "absent".

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use dropsync_core::contract::{RemoteMetadata, RemoteMetadataReader, TransferExecutor};
use dropsync_core::error::{ConfigError, RemoteError};
use dropsync_core::fingerprint::FileFingerprint;
use dropsync_core::timestamp::FileTimestamp;

use crate::load_config::Settings;

const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const API_RESULT_HEADER: &str = "Dropbox-API-Result";

/// Largest file sent with a single `files/upload` call.
pub const SINGLE_UPLOAD_LIMIT: u64 = 150 * 1024 * 1024;
/// Chunk size for upload sessions. A multiple of the hashing block size.
pub const SESSION_CHUNK: usize = 8 * 1024 * 1024;

const PART_SUFFIX: &str = ".dropsync-part";

#[derive(Clone)]
pub struct DropboxClient {
    http: Client,
    token: String,
    api_url: String,
    content_url: String,
    single_upload_limit: u64,
    session_chunk: usize,
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct CommitInfo<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    client_modified: FileTimestamp,
    mute: bool,
}

#[derive(Serialize)]
struct SessionStart {
    close: bool,
}

#[derive(Deserialize)]
struct SessionStarted {
    session_id: String,
}

#[derive(Serialize)]
struct Cursor<'a> {
    session_id: &'a str,
    offset: u64,
}

#[derive(Serialize)]
struct SessionAppend<'a> {
    cursor: Cursor<'a>,
    close: bool,
}

#[derive(Serialize)]
struct SessionFinish<'a> {
    cursor: Cursor<'a>,
    commit: CommitInfo<'a>,
}

/// The subset of file/folder metadata the sync engine needs.
#[derive(Debug, Deserialize)]
pub(crate) struct MetadataResponse {
    #[serde(rename = ".tag")]
    tag: String,
    #[serde(default)]
    content_hash: Option<FileFingerprint>,
    #[serde(default)]
    client_modified: Option<FileTimestamp>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error_summary: String,
}

impl DropboxClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("dropsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to build HTTP client");
                ConfigError::Client(Box::new(e))
            })?;
        Ok(Self::with_http_client(settings, http))
    }

    /// Uses a caller-built HTTP client, e.g. one with custom proxy settings.
    pub fn with_http_client(settings: &Settings, http: Client) -> Self {
        tracing::info!(
            api_url = %settings.api_url,
            content_url = %settings.content_url,
            "Initialised remote client"
        );
        DropboxClient {
            http,
            token: settings.token.clone(),
            api_url: settings.api_url.clone(),
            content_url: settings.content_url.clone(),
            single_upload_limit: SINGLE_UPLOAD_LIMIT,
            session_chunk: SESSION_CHUNK,
        }
    }

    /// Overrides when uploads switch to a session and how large each session chunk is.
    pub fn with_upload_limits(mut self, single_upload_limit: u64, session_chunk: usize) -> Self {
        self.single_upload_limit = single_upload_limit;
        self.session_chunk = session_chunk.max(1);
        self
    }

    fn rpc(&self, endpoint: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/2/{endpoint}", self.api_url))
            .bearer_auth(&self.token)
    }

    fn content<T: Serialize>(&self, endpoint: &str, arg: &T) -> Result<RequestBuilder, RemoteError> {
        Ok(self
            .http
            .post(format!("{}/2/{endpoint}", self.content_url))
            .bearer_auth(&self.token)
            .header(API_ARG_HEADER, header_arg(arg)?))
    }

    async fn send_bytes<T: Serialize>(
        &self,
        endpoint: &str,
        arg: &T,
        body: Vec<u8>,
    ) -> Result<Response, RemoteError> {
        let response = self
            .content(endpoint, arg)?
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        check(endpoint, response).await
    }

    async fn upload_session(
        &self,
        local_path: &Path,
        commit: CommitInfo<'_>,
    ) -> Result<(), RemoteError> {
        let mut file = tokio::fs::File::open(local_path).await?;
        let mut buffer = vec![0u8; self.session_chunk];

        let read = fill(&mut file, &mut buffer).await?;
        let started: SessionStarted = self
            .send_bytes(
                "files/upload_session/start",
                &SessionStart { close: false },
                buffer[..read].to_vec(),
            )
            .await?
            .json()
            .await?;
        let mut offset = read as u64;
        tracing::debug!(session_id = %started.session_id, offset, "Upload session started");

        loop {
            let read = fill(&mut file, &mut buffer).await?;
            if read == 0 {
                break;
            }
            let append = SessionAppend {
                cursor: Cursor {
                    session_id: &started.session_id,
                    offset,
                },
                close: false,
            };
            self.send_bytes(
                "files/upload_session/append_v2",
                &append,
                buffer[..read].to_vec(),
            )
            .await?;
            offset += read as u64;
            tracing::debug!(offset, "Upload session chunk appended");
        }

        let finish = SessionFinish {
            cursor: Cursor {
                session_id: &started.session_id,
                offset,
            },
            commit,
        };
        self.send_bytes("files/upload_session/finish", &finish, Vec::new())
            .await?;
        Ok(())
    }

    async fn download_into(
        &self,
        remote_path: &str,
        local_path: &Path,
        part: &Path,
    ) -> Result<(), RemoteError> {
        let response = self
            .content("files/download", &PathArg { path: remote_path })?
            .send()
            .await?;
        let mut response = check("files/download", response).await?;

        let client_modified = match response.headers().get(API_RESULT_HEADER) {
            Some(raw) => {
                let meta: MetadataResponse = serde_json::from_slice(raw.as_bytes())?;
                meta.client_modified
            }
            None => None,
        };

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(part).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let file = file.into_std().await;
        if let Some(modified) = client_modified {
            file.set_modified(modified.to_system_time()?)?;
        }
        drop(file);

        tokio::fs::rename(part, local_path).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteMetadataReader for DropboxClient {
    async fn get(&self, remote_path: &str) -> Result<RemoteMetadata, RemoteError> {
        tracing::debug!(remote_path, "Fetching remote metadata");
        let response = self
            .rpc("files/get_metadata")
            .json(&PathArg { path: remote_path })
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let body = response.text().await?;
            let summary = error_summary(&body);
            if summary.starts_with("path/not_found") {
                tracing::info!(remote_path, "Remote file does not exist");
                return Ok(RemoteMetadata::absent());
            }
            return Err(format!("files/get_metadata failed for {remote_path}: {summary}").into());
        }

        let meta: MetadataResponse = check("files/get_metadata", response).await?.json().await?;
        tracing::debug!(?meta, "Remote metadata received");
        metadata_from_response(meta, remote_path)
    }
}

#[async_trait]
impl TransferExecutor for DropboxClient {
    async fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
        client_modified: FileTimestamp,
    ) -> Result<(), RemoteError> {
        let size = tokio::fs::metadata(local_path).await?.len();
        tracing::info!(
            local = %local_path.display(),
            remote_path,
            size,
            %client_modified,
            "Uploading file"
        );
        let commit = CommitInfo {
            path: remote_path,
            mode: "overwrite",
            autorename: false,
            client_modified,
            mute: true,
        };

        if size > self.single_upload_limit {
            return self.upload_session(local_path, commit).await;
        }

        let body = tokio::fs::read(local_path).await?;
        self.send_bytes("files/upload", &commit, body).await?;
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError> {
        tracing::info!(remote_path, local = %local_path.display(), "Downloading file");
        let part = part_path(local_path);
        let result = self.download_into(remote_path, local_path, &part).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part).await {
                tracing::debug!(error = ?e, part = %part.display(), "No partial download to remove");
            }
        }
        result
    }
}

/// Turns a non-success response into an error carrying the API's summary.
async fn check(endpoint: &str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let summary = error_summary(&body);
    tracing::error!(endpoint, %status, %summary, "Remote call failed");
    Err(format!("{endpoint} failed with {status}: {summary}").into())
}

fn error_summary(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error_summary,
        Err(_) => body.trim().to_owned(),
    }
}

pub(crate) fn metadata_from_response(
    meta: MetadataResponse,
    remote_path: &str,
) -> Result<RemoteMetadata, RemoteError> {
    match meta.tag.as_str() {
        "file" => match meta.content_hash {
            Some(fingerprint) => Ok(RemoteMetadata::file(
                fingerprint,
                meta.client_modified.unwrap_or_default(),
            )),
            None => {
                tracing::warn!(remote_path, "Remote file has no content hash");
                Ok(RemoteMetadata {
                    exists: true,
                    fingerprint: None,
                    modified_at: meta.client_modified.unwrap_or_default(),
                })
            }
        },
        "folder" => Err(format!("{remote_path} is a folder on the remote side").into()),
        other => Err(format!("unexpected metadata type {other:?} for {remote_path}").into()),
    }
}

/// Serialises `arg` as JSON that is safe in an HTTP header: every non-ASCII
/// character and DEL is written as a `\uXXXX` escape.
pub fn header_arg<T: Serialize>(arg: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

fn part_path(local_path: &Path) -> PathBuf {
    let mut name = OsString::from(local_path.as_os_str());
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Reads until `buffer` is full or the file ends.
async fn fill(file: &mut tokio::fs::File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

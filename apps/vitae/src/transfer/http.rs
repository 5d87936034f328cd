//! reqwest implementation of `DocumentTransfer`.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response, Url};
use tracing::{debug, warn};

use crate::models::ProfileRecord;
use crate::themes::ThemeConfig;
use crate::transfer::{
    decode_parse_response, decode_rendered_document, rejection_message, Collaborator,
    DocumentTransfer, RenderedDocument, SourceDocument, TransferError,
};

const PARSE_PATH: [&str; 2] = ["api", "parse-linkedin"];
const GENERATE_PATH: [&str; 2] = ["api", "generate-resume"];
const UPLOAD_FIELD: &str = "file";
const PDF_MIME: &str = "application/pdf";

/// Talks to the parsing and rendering collaborators over HTTP.
///
/// No retries. A deadline is applied only when one is configured.
#[derive(Clone)]
pub struct HttpTransferClient {
    client: Client,
    parse_base_url: Url,
    render_base_url: Url,
}

impl HttpTransferClient {
    pub fn new(
        parse_base_url: &str,
        render_base_url: &str,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            parse_base_url: base_url(parse_base_url)?,
            render_base_url: base_url(render_base_url)?,
        })
    }

    fn parse_url(&self) -> Url {
        endpoint(&self.parse_base_url, PARSE_PATH, None)
    }

    /// The profile id is opaque: it is appended as one percent-encoded
    /// segment, so `/`, `?` and `#` inside it stay part of the id.
    fn generate_url(&self, profile_id: &str) -> Url {
        endpoint(&self.render_base_url, GENERATE_PATH, Some(profile_id))
    }
}

fn base_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid collaborator URL '{raw}'"))?;
    if url.cannot_be_a_base() {
        bail!("Collaborator URL '{raw}' cannot carry a path");
    }
    Ok(url)
}

fn endpoint(base: &Url, path: [&str; 2], id: Option<&str>) -> Url {
    let mut url = base.clone();
    // `new` only accepts URLs that can carry a path.
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(path).extend(id);
    }
    url
}

fn unavailable(service: Collaborator, e: reqwest::Error) -> TransferError {
    TransferError::UpstreamUnavailable {
        service,
        detail: e.to_string(),
    }
}

/// Turns a non-success response into `UpstreamRejected`; passes success through.
async fn check_status(
    service: Collaborator,
    response: Response,
) -> Result<Response, TransferError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = rejection_message(service, status.as_u16(), &body);
    warn!("{service} returned {status}: {message}");

    Err(TransferError::UpstreamRejected {
        service,
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentTransfer for HttpTransferClient {
    async fn parse_document(
        &self,
        document: SourceDocument,
    ) -> Result<ProfileRecord, TransferError> {
        let service = Collaborator::Parser;
        let size = document.bytes.len();

        let part = multipart::Part::bytes(document.bytes.to_vec())
            .file_name(document.filename)
            .mime_str(PDF_MIME)
            .map_err(|e| unavailable(service, e))?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let url = self.parse_url();
        debug!("POST {url} ({size} bytes)");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| unavailable(service, e))?;

        let response = check_status(service, response).await?;
        let body = response.bytes().await.map_err(|e| unavailable(service, e))?;

        let record = decode_parse_response(&body)?;
        debug!("Parsed profile {}", record.profile_id);
        Ok(record)
    }

    async fn generate_document(
        &self,
        profile_id: &str,
        theme: &ThemeConfig,
    ) -> Result<RenderedDocument, TransferError> {
        let service = Collaborator::Renderer;
        let url = self.generate_url(profile_id);

        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(theme)
            .send()
            .await
            .map_err(|e| unavailable(service, e))?;

        let response = check_status(service, response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        if content_type.as_deref().map_or(true, |ct| !ct.starts_with(PDF_MIME)) {
            warn!("{service} returned content-type {content_type:?} for profile {profile_id}");
        }

        let body = response.bytes().await.map_err(|e| unavailable(service, e))?;
        decode_rendered_document(profile_id, body)
    }
}

//! JSON wire format of the `/api/processar-foto` endpoint.
//!
//! Field names follow the public API (`imagem`, `tamanho`, ...); everything
//! past this module uses the typed [`ProcessingRequest`] / [`ProcessingResult`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::pipeline::ImageProcessor;
use crate::types::{ProcessingRequest, ProcessingResult};

/// Inbound request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessPhotoRequest {
    /// `data:<mime>;base64,<payload>`
    pub imagem: Option<String>,

    /// `[height, width]`
    pub tamanho: Option<Vec<i64>>,

    /// Persist the original as well (default true)
    pub salvar_original: Option<bool>,
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPhotoResponse {
    pub dimensao_original: [u32; 2],
    pub dimensao_processada: [u32; 2],
    pub valor_min: f64,
    pub valor_max: f64,
    pub arquivo_salvo: String,
    pub arquivo_salvo_url: String,
    pub arquivo_original: Option<String>,
    pub arquivo_original_url: Option<String>,
    pub imagem_processada_base64: String,
}

/// Body of `GET /api/fotos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoListResponse {
    /// Stored object paths, processed and originals, sorted
    pub fotos: Vec<String>,
    pub total: usize,
}

impl PhotoListResponse {
    pub fn new(fotos: Vec<String>) -> Self {
        Self {
            total: fotos.len(),
            fotos,
        }
    }
}

/// Body sent along with the redirect of `GET /api/foto/<path>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoLocationResponse {
    pub arquivo: String,
    pub url: String,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub erro: String,
}

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared MIME type; `None` when the header omits it
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

/// Parse `data:<mime>;base64,<payload>`.
pub fn parse_data_url(value: &str) -> Result<DataUrl> {
    let (header, payload) = value.split_once(',').ok_or_else(|| {
        ServiceError::MalformedRequest("imagem is not a data URL (missing ',')".to_string())
    })?;
    let meta = header.trim().strip_prefix("data:").ok_or_else(|| {
        ServiceError::MalformedRequest("imagem is not a data URL (missing 'data:')".to_string())
    })?;
    let media_type = meta.strip_suffix(";base64").ok_or_else(|| {
        ServiceError::MalformedRequest("imagem data URL must be base64-encoded".to_string())
    })?;
    let data = BASE64
        .decode(payload.trim())
        .map_err(|e| ServiceError::MalformedRequest(format!("invalid base64 payload: {e}")))?;

    Ok(DataUrl {
        media_type: (!media_type.is_empty()).then(|| media_type.to_string()),
        data,
    })
}

impl ProcessPhotoRequest {
    /// Parse a raw JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::MalformedRequest(format!("invalid JSON body: {e}")))
    }

    /// Validate fields and produce a typed request.
    ///
    /// The image is checked before the size, so a request that is wrong on
    /// both counts reports the malformed image.
    pub fn into_processing_request(self, processor: &ImageProcessor) -> Result<ProcessingRequest> {
        let imagem = self
            .imagem
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ServiceError::MalformedRequest("no image provided".to_string()))?;
        let data_url = parse_data_url(&imagem)?;

        let target = match self.tamanho.as_deref() {
            None => processor.default_target(),
            Some(&[height, width]) => processor.target_size(height, width)?,
            Some(other) => {
                return Err(ServiceError::MalformedRequest(format!(
                    "tamanho must be [height, width], got {} values",
                    other.len()
                )))
            }
        };

        Ok(ProcessingRequest {
            image: data_url.data,
            media_type: data_url.media_type,
            target,
            save_original: self.salvar_original.unwrap_or(true),
        })
    }
}

impl From<&ProcessingResult> for ProcessPhotoResponse {
    fn from(result: &ProcessingResult) -> Self {
        let image = &result.image;
        Self {
            dimensao_original: [image.original_dims.0, image.original_dims.1],
            dimensao_processada: [image.processed_dims.0, image.processed_dims.1],
            valor_min: image.valor_min,
            valor_max: image.valor_max,
            arquivo_salvo: result.processed.path.clone(),
            arquivo_salvo_url: result.processed.url.clone(),
            arquivo_original: result.original.as_ref().map(|o| o.path.clone()),
            arquivo_original_url: result.original.as_ref().map(|o| o.url.clone()),
            imagem_processada_base64: BASE64.encode(&image.processed_png),
        }
    }
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            erro: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(error: &ServiceError) -> Self {
        Self::new(error.to_string())
    }
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

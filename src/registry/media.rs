//! Turns uploaded photos and voice notes into inline `data:` references.
//!
//! A requested style transfer is best-effort: when the remote edit fails the
//! configured [`PhotoFallback`] decides what is stored, and the registration
//! itself always goes ahead.

use std::{fmt, str::FromStr};

use axum::body::Bytes;
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{info, warn};

use crate::{
    remote::{ImageStylist, RemoteServiceError},
    res::GHIBLI_PROMPT,
};

const DEFAULT_MIME: &str = "application/octet-stream";
const STYLED_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub bytes: Bytes,
    pub mime: String,
}

impl Upload {
    pub fn new(bytes: Bytes, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        let mime = if mime.trim().is_empty() {
            DEFAULT_MIME.to_owned()
        } else {
            mime
        };
        Self { bytes, mime }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// File extension matching the MIME subtype, for services that sniff file names.
    pub fn extension(&self) -> &str {
        match self.mime.split_once('/').map(|(_, subtype)| subtype) {
            Some("jpeg") => "jpg",
            Some(subtype) if !subtype.is_empty() => subtype.split([';', '+']).next().unwrap_or("bin"),
            _ => "bin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoStyle {
    #[default]
    Normal,
    Ghibli,
}

impl PhotoStyle {
    /// Anything other than `ghibli` keeps the photo as uploaded.
    pub fn from_field(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(style) if style.eq_ignore_ascii_case("ghibli") => PhotoStyle::Ghibli,
            _ => PhotoStyle::Normal,
        }
    }
}

/// What to store when a style transfer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoFallback {
    /// Register the guest without a photo.
    #[default]
    DropPhoto,
    /// Store the photo as uploaded.
    KeepOriginal,
}

impl FromStr for PhotoFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(PhotoFallback::DropPhoto),
            "keep" => Ok(PhotoFallback::KeepOriginal),
            other => Err(format!("expected drop or keep, got {other:?}")),
        }
    }
}

impl fmt::Display for PhotoFallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PhotoFallback::DropPhoto => "dropping the photo",
            PhotoFallback::KeepOriginal => "keeping the original photo",
        })
    }
}

pub async fn normalize_photo(
    photo: Upload,
    style: PhotoStyle,
    stylist: &dyn ImageStylist,
    fallback: PhotoFallback,
) -> Option<String> {
    if photo.is_empty() {
        return None;
    }

    match style {
        PhotoStyle::Normal => Some(photo.to_data_url()),
        PhotoStyle::Ghibli => match stylize(&photo, stylist).await {
            Ok(styled) => {
                info!("photo restyled ({} bytes in)", photo.bytes.len());
                Some(styled)
            }
            Err(err) => {
                warn!("style transfer failed, {fallback}: {err}");
                match fallback {
                    PhotoFallback::DropPhoto => None,
                    PhotoFallback::KeepOriginal => Some(photo.to_data_url()),
                }
            }
        },
    }
}

/// Sends the photo through the style-transfer service and encodes its answer.
pub async fn stylize(photo: &Upload, stylist: &dyn ImageStylist) -> Result<String, RemoteServiceError> {
    let styled = stylist.stylize(photo, GHIBLI_PROMPT).await?;
    if styled.is_empty() {
        return Err(RemoteServiceError::Malformed(
            "Failed to generate Ghibli-style image".to_owned(),
        ));
    }
    Ok(Upload::new(styled, STYLED_MIME).to_data_url())
}

pub fn normalize_voice_note(voice_note: &Upload) -> Option<String> {
    (!voice_note.is_empty()).then(|| voice_note.to_data_url())
}

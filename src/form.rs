use std::collections::HashMap;

use axum::{
    Form,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};

use crate::{AppError, registry::media::Upload};

/// Text fields and file parts of a submitted form, multipart or urlencoded.
#[derive(Debug, Default)]
pub struct FormFields {
    texts: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormFields {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut fields = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if field.file_name().is_some() {
                let mime = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                fields.files.insert(name, Upload::new(bytes, mime));
            } else {
                fields.texts.insert(name, field.text().await?);
            }
        }

        Ok(fields)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.texts.remove(name)
    }

    /// First of `names` that was sent, for fields clients spell more than one way.
    pub fn take_text_any(&mut self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.take_text(name))
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}

impl<T: Into<String>> FromIterator<(T, T)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        Self {
            texts: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            files: HashMap::new(),
        }
    }
}

impl<S: Send + Sync> FromRequest<S> for FormFields {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            return Self::from_multipart(multipart).await;
        }

        let Form(texts) = Form::<HashMap<String, String>>::from_request(req, state).await?;
        Ok(texts.into_iter().collect())
    }
}

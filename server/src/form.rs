use std::collections::HashMap;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::Multipart;
use tracing::debug;

use crate::error::ApiError;

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully buffered multipart form.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl Form {
    pub async fn collect(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    debug!(field = %name, file = %file_name, bytes = bytes.len(), "received upload");
                    form.files.insert(name, Upload { file_name, bytes });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// A non-empty uploaded file.
    pub fn file(&self, name: &str) -> Result<&Upload, ApiError> {
        self.files
            .get(name)
            .filter(|u| !u.bytes.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("No {name} file found in the request")))
    }

    /// A text field, treating blank values as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Parse an optional field, falling back to `default` when absent.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, ApiError> {
        match self.text(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::bad_request(format!("{name} must be a number, got '{raw}'"))),
        }
    }

    /// Like [`Form::parse_or`] for seconds, rejecting zero, negative and non-finite values.
    pub fn positive_seconds(&self, name: &str, default: f64) -> Result<f64, ApiError> {
        let value = self.parse_or(name, default)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ApiError::bad_request(format!("{name} must be positive")))
        }
    }
}

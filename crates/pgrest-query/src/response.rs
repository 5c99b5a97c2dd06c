use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error code attached when a successful body could not be decoded.
pub const DECODE_ERROR_CODE: &str = "PGRST_DECODE";

/// Error half of the envelope.
///
/// Backend errors carry whatever `message`/`code`/`details`/`hint` the
/// server sent; transport failures carry only a message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct PostgrestError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl PostgrestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// The uniform `{data, error, count}` envelope every execution resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgrestResponse<T = Value> {
    pub data: Option<T>,
    pub error: Option<PostgrestError>,
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T> PostgrestResponse<T> {
    pub fn ok(data: Option<T>, count: Option<u64>, status: u16) -> Self {
        Self {
            data,
            error: None,
            count,
            status: Some(status),
        }
    }

    pub fn err(error: PostgrestError, count: Option<u64>, status: Option<u16>) -> Self {
        Self {
            data: None,
            error: Some(error),
            count,
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<T>, PostgrestError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl PostgrestResponse<Value> {
    /// Decodes `data` into `U`. A shape mismatch becomes an envelope error
    /// with code [`DECODE_ERROR_CODE`].
    pub fn into_typed<U: DeserializeOwned>(self) -> PostgrestResponse<U> {
        let Self {
            data,
            error,
            count,
            status,
        } = self;

        let data = match data.map(serde_json::from_value::<U>).transpose() {
            Ok(data) => data,
            Err(err) => {
                return PostgrestResponse::err(
                    PostgrestError::new(format!("Failed to decode response data: {err}"))
                        .with_code(DECODE_ERROR_CODE),
                    count,
                    status,
                );
            }
        };

        PostgrestResponse {
            data,
            error,
            count,
            status,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::ObjectKey;

/// Response body of `GET {base}list?page={n}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    #[serde(rename = "Contents")]
    pub contents: Vec<ObjectKey>,
    /// The backend echoes the page it resolved the listing for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Response body of `GET {base}get/{key}`. `body` is the stored object as a
/// base64-encoded UTF-8 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetObjectResponse {
    pub body: String,
}

/// Message envelope used by the delete and upload endpoints, on both the
/// success and the error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub msg: String,
}

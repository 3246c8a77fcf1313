use std::collections::HashMap;

use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use uuid::Uuid;

use crate::state::AppState;

/// Presigned links handed to clients live this long.
pub const URL_TTL_SECS: u64 = 30 * 60;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Text fields plus the single `file` part of a multipart form.
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadItem>,
}

pub async fn read_upload_form(mut mp: Multipart) -> anyhow::Result<UploadForm> {
    let mut fields = HashMap::new();
    let mut file = None;
    while let Some(field) = mp.next_field().await.context("read multipart field")? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field.bytes().await.context("read multipart file")?;
            file = Some(UploadItem { body, content_type });
        } else {
            let value = field.text().await.context("read multipart text")?;
            fields.insert(name, value);
        }
    }
    Ok(UploadForm { fields, file })
}

/// Rejects anything that is not a known picture format or is empty/oversized.
pub fn validate_image(item: &UploadItem) -> Result<&'static str, String> {
    if item.body.is_empty() {
        return Err("file is empty".into());
    }
    if item.body.len() > MAX_IMAGE_BYTES {
        return Err("file is too large".into());
    }
    ext_from_mime(&item.content_type).ok_or_else(|| format!("unsupported content type {}", item.content_type))
}

pub fn object_key(scope: &str, user_id: Uuid, owner_id: Uuid, ext: &str) -> String {
    format!("{}/{}/{}-{}.{}", scope, user_id, owner_id, Uuid::new_v4(), ext)
}

/// Stores the picture and returns its object key.
pub async fn upload_image(
    st: &AppState,
    scope: &str,
    user_id: Uuid,
    owner_id: Uuid,
    item: UploadItem,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = object_key(scope, user_id, owner_id, ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best effort: a dangling object is preferable to failing the request that replaced it.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        tracing::warn!(error = %e, key, "delete_object failed");
    }
}

pub async fn presign_optional(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    match key {
        Some(k) => st
            .storage
            .presign_get(k, URL_TTL_SECS)
            .await
            .with_context(|| format!("presign url for {}", k))
            .map(Some),
        None => Ok(None),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

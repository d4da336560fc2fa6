//! Drive file metadata.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::mimetypes;

/// A file on Drive. This might be a directory as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Drive file id.
    pub id: String,
    /// File name (not unique within a folder).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource kind, usually `drive#file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes; absent for folders and native Google documents.
    #[serde(
        default,
        deserialize_with = "deserialize_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
    /// Parent folder ids. A file may have several parents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    /// Link opening the file in a browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl File {
    /// Create a file handle from its id only.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Handle on a folder known by id.
    pub fn folder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: Some(mimetypes::GOOGLE_DRIVE_FOLDER.to_string()),
            ..Default::default()
        }
    }

    /// Whether this file is a folder; `None` when the MIME type is unknown.
    pub fn is_directory(&self) -> Option<bool> {
        self.mime_type
            .as_deref()
            .map(|mime| mime == mimetypes::GOOGLE_DRIVE_FOLDER)
    }

    /// Human-friendly file type.
    pub fn human_type(&self) -> String {
        match self.mime_type.as_deref() {
            Some(mimetypes::GOOGLE_DRIVE_FOLDER) => return "folder".into(),
            Some(mimetypes::GOOGLE_SHEETS) => return "Google Spreadsheet".into(),
            Some(mimetypes::JSON) => return "JSON".into(),
            _ => {}
        }

        if let Some(ref name) = self.name {
            if name.to_lowercase().ends_with(".jsons") {
                return "JSONS".into();
            }
        }

        self.mime_type.clone().unwrap_or_else(|| "?".into())
    }

    /// First parent id, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.parents
            .as_ref()
            .and_then(|parents| parents.first())
            .map(String::as_str)
    }

    /// The file's metadata as a JSON object.
    ///
    /// Mandatory keys: `"id"`, `"name"`. Optional: `"parents"`.
    pub fn to_dict(&self) -> Value {
        let mut map: Map<String, Value> = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("name".into(), json!(self.name));
        if let Some(ref parents) = self.parents {
            if !parents.is_empty() {
                map.insert("parents".into(), json!(parents));
            }
        }
        Value::Object(map)
    }

    /// Merge newer metadata into this instance.
    ///
    /// Only non-empty names and parents are taken over.
    pub fn update_from(&mut self, other: &File) {
        if let Some(ref name) = other.name {
            if !name.is_empty() {
                self.name = Some(name.clone());
            }
        }
        if let Some(ref parents) = other.parents {
            if !parents.is_empty() {
                self.parents = Some(parents.clone());
            }
        }
    }
}

impl File {
    /// Order files by name, for sorting listings.
    pub fn cmp_by_name(&self, other: &File) -> Ordering {
        self.name
            .as_deref()
            .unwrap_or("")
            .cmp(other.name.as_deref().unwrap_or(""))
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or(""))
    }
}


/// The API encodes sizes as decimal strings.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One page of a file listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A permission granted on a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Role granted (`reader`, `writer`, ...).
    pub role: String,
    /// Grantee type (`user`, `group`, `domain`, `anyone`).
    #[serde(rename = "type")]
    pub grantee_type: String,
}

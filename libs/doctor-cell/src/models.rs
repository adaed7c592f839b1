use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A doctor row as the directory stores it. Read-only from this crate.
/// PostgREST sends `null` for unset columns, so every column tolerates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specialty: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_approved: bool,
    #[serde(default = "default_active", deserialize_with = "null_as_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_active))
}

impl DoctorRecord {
    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary::from(self)
    }

    pub fn entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            id: self.id.clone(),
            practice: self.specialty.clone(),
        }
    }
}

/// What callers of the HTTP API see for each recommended doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: String,
    pub name: String,
    pub practice: String,
    pub location: Option<String>,
}

impl From<&DoctorRecord> for DoctorSummary {
    fn from(record: &DoctorRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.full_name.clone(),
            practice: record.specialty.clone(),
            location: record.location.clone(),
        }
    }
}

/// `{id, practice}` pair, the shape handed to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub practice: String,
}

/// Which approved doctors a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupScope {
    pub active_only: bool,
}

impl LookupScope {
    /// Approved and currently active; what patients are shown.
    pub fn public() -> Self {
        Self { active_only: true }
    }

    /// Approved doctors whether or not they are active.
    pub fn approved() -> Self {
        Self { active_only: false }
    }
}

impl Default for LookupScope {
    fn default() -> Self {
        Self::public()
    }
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor directory unavailable: {0}")]
    Store(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        DoctorError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_projections() {
        let record: DoctorRecord = serde_json::from_value(json!({
            "id": "A",
            "full_name": "Dr. Ada Lind",
            "specialty": "Neurologist",
            "location": null,
            "is_approved": true
        }))
        .unwrap();

        assert!(record.is_active);
        assert_eq!(record.entry(), DirectoryEntry { id: "A".into(), practice: "Neurologist".into() });
        assert_eq!(record.summary().name, "Dr. Ada Lind");
        assert_eq!(record.summary().practice, "Neurologist");
    }

    #[test]
    fn test_null_columns_decode_to_defaults() {
        let record: DoctorRecord = serde_json::from_value(json!({
            "id": "B",
            "full_name": null,
            "specialty": null,
            "location": null,
            "is_approved": null,
            "is_active": null
        }))
        .unwrap();

        assert_eq!(record.full_name, "");
        assert_eq!(record.specialty, "");
        assert!(!record.is_approved);
        assert!(record.is_active);
    }
}

use crate::monitor::{Monitor, Status};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize, Debug)]
pub struct Page {
    pub data: Vec<MonitorRecord>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl Page {
    pub fn has_next(&self) -> bool {
        self.pagination
            .as_ref()
            .and_then(|pagination| pagination.next.as_ref())
            .is_some()
    }
}

#[derive(Deserialize, Debug)]
pub struct Pagination {
    pub next: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MonitorRecord {
    pub id: String,
    pub attributes: Attributes,
}

#[derive(Deserialize, Debug)]
pub struct Attributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    pub pronounceable_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
}

/// A `null` field decodes like a missing one so one odd record cannot fail a whole page
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<MonitorRecord> for Monitor {
    fn from(record: MonitorRecord) -> Self {
        let display_name = record
            .attributes
            .pronounceable_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| record.attributes.url.clone());

        Monitor {
            id: record.id,
            url: record.attributes.url,
            display_name,
            status: record.attributes.status,
        }
    }
}

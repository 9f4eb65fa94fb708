//! Volume list response model and record extraction.

use crate::types::{LIST_DELIMITER, Record};
use serde::Deserialize;

/// Top-level volume search response
///
/// A missing or null `items` collection means zero results.
#[derive(Debug, Deserialize)]
pub(crate) struct VolumeList {
    #[serde(default)]
    pub(crate) items: Option<Vec<Volume>>,
}

impl VolumeList {
    pub(crate) fn into_records(self) -> Vec<Record> {
        self.items
            .unwrap_or_default()
            .into_iter()
            .map(|volume| Record::from(volume.volume_info))
            .collect()
    }
}

/// One search hit; an item without `volumeInfo` fails the whole body
#[derive(Debug, Deserialize)]
pub(crate) struct Volume {
    #[serde(rename = "volumeInfo")]
    pub(crate) volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeInfo {
    pub(crate) title: Option<String>,
    pub(crate) subtitle: Option<String>,
    #[serde(default)]
    pub(crate) authors: Vec<String>,
    #[serde(default)]
    pub(crate) categories: Vec<String>,
    pub(crate) image_links: Option<ImageLinks>,
    pub(crate) description: Option<String>,
    pub(crate) published_date: Option<String>,
    #[serde(default)]
    pub(crate) industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageLinks {
    pub(crate) thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) identifier: Option<String>,
}

impl From<VolumeInfo> for Record {
    fn from(info: VolumeInfo) -> Self {
        let mut isbn10 = None;
        let mut isbn13 = None;
        // Later identifiers of the same type overwrite earlier ones
        for id in info.industry_identifiers {
            match id.kind.as_deref() {
                Some("ISBN_10") => isbn10 = id.identifier,
                Some("ISBN_13") => isbn13 = id.identifier,
                _ => {}
            }
        }

        Record {
            isbn10,
            isbn13,
            title: info.title,
            subtitle: info.subtitle,
            authors: join_list(&info.authors),
            categories: join_list(&info.categories),
            thumbnail_url: info.image_links.and_then(|links| links.thumbnail),
            description: info.description,
            published_year: info.published_date.as_deref().and_then(published_year),
        }
    }
}

fn join_list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(LIST_DELIMITER))
    }
}

/// First four characters of `date`, when they are all ASCII digits
pub(crate) fn published_year(date: &str) -> Option<String> {
    let year = date.get(..4)?;
    if year.bytes().all(|b| b.is_ascii_digit()) {
        Some(year.to_string())
    } else {
        None
    }
}

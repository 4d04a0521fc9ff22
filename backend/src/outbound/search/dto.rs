//! Request and response DTOs for the Meilisearch search endpoint.

use serde::{Deserialize, Serialize};

use crate::domain::{ProductId, ProductQuery};
use crate::domain::ports::SearchHits;

#[derive(Debug, Serialize)]
pub(super) struct SearchRequestDto {
    q: String,
    limit: u32,
    offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

impl SearchRequestDto {
    pub(super) fn from_query(query: &ProductQuery) -> Self {
        Self {
            q: query.text.clone().unwrap_or_default(),
            limit: query.limit,
            offset: query.offset,
            filter: query
                .category
                .as_deref()
                .map(|category| format!("category = \"{}\"", escape_filter_value(category))),
        }
    }
}

fn escape_filter_value(raw: &str) -> String {
    raw.replace('\\', r"\\").replace('"', "\\\"")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchResponseDto {
    hits: Vec<HitDto>,
    #[serde(default)]
    estimated_total_hits: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HitDto {
    id: String,
}

impl SearchResponseDto {
    pub(super) fn into_hits(self) -> Result<SearchHits, String> {
        let ids = self
            .hits
            .into_iter()
            .map(|hit| ProductId::new(&hit.id).map_err(|err| format!("hit `{}`: {err}", hit.id)))
            .collect::<Result<Vec<_>, _>>()?;
        let total = self
            .estimated_total_hits
            .unwrap_or_else(|| u64::try_from(ids.len()).unwrap_or(u64::MAX));
        Ok(SearchHits { ids, total })
    }
}

//! Client for the advanced title search endpoint (RapidAPI hosted).

use super::{SearchPage, TitleSearchSource};
use crate::config::SearchApiSettings;
use crate::movie_store::DiscoveredTitle;
use anyhow::{bail, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-rapidapi-key";
const API_HOST_HEADER: &str = "x-rapidapi-host";

pub struct SearchApiClient {
    client: Client,
    settings: SearchApiSettings,
}

#[derive(Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    data: SearchData,
}

#[derive(Deserialize, Default)]
struct SearchData {
    #[serde(rename = "advancedTitleSearch", default)]
    advanced_title_search: AdvancedTitleSearch,
}

#[derive(Deserialize, Default)]
struct AdvancedTitleSearch {
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
}

#[derive(Deserialize, Default)]
struct PageInfo {
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
}

#[derive(Deserialize)]
struct Edge {
    node: EdgeNode,
}

#[derive(Deserialize)]
struct EdgeNode {
    title: SearchTitle,
}

#[derive(Deserialize)]
struct SearchTitle {
    id: String,
    #[serde(rename = "titleText")]
    title_text: Option<TitleText>,
}

#[derive(Deserialize)]
struct TitleText {
    text: Option<String>,
}

impl SearchResponse {
    fn into_page(self) -> SearchPage {
        let search = self.data.advanced_title_search;
        let titles = search
            .edges
            .into_iter()
            .map(|edge| {
                let title = edge.node.title;
                DiscoveredTitle {
                    id: title.id,
                    title: title.title_text.and_then(|t| t.text).unwrap_or_default(),
                }
            })
            .collect();

        SearchPage {
            titles,
            end_cursor: search.page_info.end_cursor.filter(|c| !c.is_empty()),
            has_next_page: search.page_info.has_next_page,
        }
    }
}

impl SearchApiClient {
    pub fn new(settings: SearchApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Payload for one page of movies released in `year`, most rated first.
    fn search_payload(&self, year: i32, cursor: Option<&str>) -> JsonValue {
        json!({
            "first": self.settings.page_size,
            "after": cursor.unwrap_or(""),
            "includeReleaseDates": false,
            "sort": {
                "sortBy": "USER_RATING_COUNT",
                "sortOrder": "DESC"
            },
            "releaseDateRange": {
                "start": format!("{}-01-01", year),
                "end": format!("{}-12-31", year)
            },
            "ratingsCountRange": { "min": self.settings.min_ratings_count },
            "anyPrimaryLanguages": [self.settings.language],
            "anyTitleTypeIds": [self.settings.title_type]
        })
    }
}

impl TitleSearchSource for SearchApiClient {
    fn search_page(&self, year: i32, cursor: Option<&str>) -> Result<SearchPage> {
        let response = self
            .client
            .post(&self.settings.url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .header(API_HOST_HEADER, &self.settings.host)
            .json(&self.search_payload(year, cursor))
            .send()?;

        if !response.status().is_success() {
            bail!("Title search failed with status {}", response.status());
        }

        let body: SearchResponse = response.json()?;
        Ok(body.into_page())
    }
}

//! Mapping of upstream payloads onto the normalized catalog types.
//!
//! The upstream schema is not documented, so every concept is looked up
//! under a list of alternate field paths and the first present value wins.
//! The lists live in [`FieldMap`] and can be overridden from configuration;
//! a different mapping altogether can be plugged in through [`Normalizer`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::types::{
  AnimeSummary, HomeFeedSnapshot, RankedEntry, SearchResultPage, SpotlightEntry,
};

/// Turns the `data` member of an upstream envelope into result shapes.
///
/// Only [`Normalizer::anime`] is required; the list-level mappings are
/// provided in terms of it.
pub trait Normalizer: Send + Sync {
  /// Map a single anime object. Returns `None` when `raw` is not an object.
  fn anime(&self, raw: &Value) -> Option<AnimeSummary>;

  fn home_feed(&self, data: &Value, fetched_at: DateTime<Utc>) -> HomeFeedSnapshot {
    let spotlight = array_at(data, "spotlightAnimes")
      .filter_map(|raw| {
        self.anime(raw).map(|anime| SpotlightEntry {
          anime,
          rank: u32_at(raw, "rank").unwrap_or(0),
          extra_info: strings_at(raw, "otherInfo"),
        })
      })
      .collect();

    let trending = array_at(data, "trendingAnimes")
      .filter_map(|raw| self.anime(raw))
      .collect();

    let top_airing = array_at(data, "top10Animes.today")
      .filter_map(|raw| {
        self.anime(raw).map(|anime| RankedEntry {
          anime,
          rank: u32_at(raw, "rank").unwrap_or(0),
        })
      })
      .collect();

    HomeFeedSnapshot {
      spotlight,
      trending,
      top_airing,
      fetched_at: Some(fetched_at),
    }
  }

  /// Map a details payload. `None` when it holds no anime object.
  fn anime_details(&self, data: &Value) -> Option<AnimeSummary> {
    lookup(data, "anime").and_then(|raw| self.anime(raw))
  }

  fn search_page(&self, data: &Value, requested_page: u32) -> SearchResultPage {
    SearchResultPage {
      results: array_at(data, "animes")
        .filter_map(|raw| self.anime(raw))
        .collect(),
      page: u32_at(data, "currentPage").unwrap_or(requested_page),
      total_pages: u32_at(data, "totalPages").unwrap_or(1),
      has_next_page: lookup(data, "hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false),
      total_results: u32_at(data, "totalResults").unwrap_or(0),
    }
  }
}

/// Alternate field paths per concept, in priority order. Paths use `.` to
/// descend into nested objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldMap {
  pub id: Vec<String>,
  pub title: Vec<String>,
  pub poster: Vec<String>,
  pub rating: Vec<String>,
  pub total_episodes: Vec<String>,
  pub kind: Vec<String>,
  pub status: Vec<String>,
  pub genres: Vec<String>,
  pub description: Vec<String>,
  pub year: Vec<String>,
  pub duration: Vec<String>,
  pub studios: Vec<String>,
  pub audio_track: Vec<String>,
}

fn paths(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldMap {
  fn default() -> Self {
    Self {
      id: paths(&["id"]),
      title: paths(&["name", "title"]),
      poster: paths(&["poster", "image"]),
      rating: paths(&["rating.mal", "score"]),
      total_episodes: paths(&["episodes.total", "totalEpisodes"]),
      kind: paths(&["type"]),
      status: paths(&["status"]),
      genres: paths(&["genres"]),
      description: paths(&["description", "synopsis"]),
      year: paths(&["releaseDate.year", "year"]),
      duration: paths(&["duration"]),
      studios: paths(&["studios"]),
      audio_track: paths(&["subOrDub"]),
    }
  }
}

/// Default normalizer driven by a [`FieldMap`].
#[derive(Debug, Clone, Default)]
pub struct FieldMapNormalizer {
  fields: FieldMap,
}

impl FieldMapNormalizer {
  pub fn new(fields: FieldMap) -> Self {
    Self { fields }
  }
}

impl Normalizer for FieldMapNormalizer {
  fn anime(&self, raw: &Value) -> Option<AnimeSummary> {
    if !raw.is_object() {
      return None;
    }

    let f = &self.fields;
    let defaults = AnimeSummary::default();

    Some(AnimeSummary {
      id: first_string(raw, &f.id).unwrap_or(defaults.id),
      title: first_string(raw, &f.title).unwrap_or(defaults.title),
      poster_url: first_string(raw, &f.poster).unwrap_or(defaults.poster_url),
      rating: first(raw, &f.rating, as_f64).unwrap_or(defaults.rating),
      total_episodes: first(raw, &f.total_episodes, as_u32).unwrap_or(defaults.total_episodes),
      kind: first_string(raw, &f.kind).unwrap_or(defaults.kind),
      status: first_string(raw, &f.status).unwrap_or(defaults.status),
      genres: first(raw, &f.genres, as_strings).unwrap_or(defaults.genres),
      description: first_string(raw, &f.description).unwrap_or(defaults.description),
      year: first(raw, &f.year, |v| as_f64(v).map(|y| y as i32)),
      duration_minutes: first(raw, &f.duration, as_minutes),
      studios: first(raw, &f.studios, as_strings).unwrap_or(defaults.studios),
      audio_track: first_string(raw, &f.audio_track).unwrap_or(defaults.audio_track),
    })
  }
}

/// Follow a dotted path. Null and empty strings count as absent.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  let found = path
    .split('.')
    .try_fold(value, |current, segment| current.get(segment))?;

  match found {
    Value::Null => None,
    Value::String(s) if s.is_empty() => None,
    other => Some(other),
  }
}

/// First path whose value is present and converts.
fn first<T>(raw: &Value, paths: &[String], convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
  paths
    .iter()
    .filter_map(|path| lookup(raw, path))
    .find_map(convert)
}

fn first_string(raw: &Value, paths: &[String]) -> Option<String> {
  first(raw, paths, |v| match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}

fn as_f64(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn as_u32(value: &Value) -> Option<u32> {
  as_f64(value)
    .filter(|n| *n >= 0.0)
    .map(|n| n as u32)
}

/// Accepts `24`, `"24"` and `"24m"` style durations.
fn as_minutes(value: &Value) -> Option<u32> {
  match value {
    Value::String(s) => {
      let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
      digits.parse().ok()
    }
    other => as_u32(other),
  }
}

fn as_strings(value: &Value) -> Option<Vec<String>> {
  value.as_array().map(|items| {
    items
      .iter()
      .filter_map(|item| item.as_str().map(String::from))
      .collect()
  })
}

fn array_at<'a>(data: &'a Value, path: &str) -> impl Iterator<Item = &'a Value> {
  lookup(data, path)
    .and_then(Value::as_array)
    .into_iter()
    .flatten()
}

fn u32_at(data: &Value, path: &str) -> Option<u32> {
  lookup(data, path).and_then(as_u32)
}

fn strings_at(data: &Value, path: &str) -> Vec<String> {
  lookup(data, path).and_then(as_strings).unwrap_or_default()
}

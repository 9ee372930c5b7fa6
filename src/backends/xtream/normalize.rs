//! Normalization of Xtream-Codes payloads into catalog records.
//!
//! Panels disagree on field names and on whether numbers are sent as JSON
//! numbers or strings. Every lookup below lists its field names in precedence
//! order (camelCase first, then snake_case, then panel specific aliases) and
//! falls back to a default when none is present. Records without a usable
//! identifier are logged and skipped.

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{
    Category, CategoryId, Channel, ContentId, ContentItem, ContentKind, Episode, EpisodeInfo,
    Movie, MovieDetails, ServerInfo, Show, ShowDetails, UserInfo, group_into_seasons,
};
use crate::utils::errors::{CatalogError, CatalogResult};

type Record = Map<String, Value>;

/// First present, non-null, non-blank value among `names`.
fn field<'a>(record: &'a Record, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

fn string_field(record: &Record, names: &[&str]) -> Option<String> {
    match field(record, names)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn u64_field(record: &Record, names: &[&str]) -> Option<u64> {
    match field(record, names)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn u32_field(record: &Record, names: &[&str]) -> Option<u32> {
    u64_field(record, names).and_then(|n| u32::try_from(n).ok())
}

fn i64_field(record: &Record, names: &[&str]) -> Option<i64> {
    match field(record, names)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn f32_field(record: &Record, names: &[&str]) -> Option<f32> {
    match field(record, names)? {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

fn bool_field(record: &Record, names: &[&str]) -> Option<bool> {
    match field(record, names)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Arrays of strings, or a single string.
fn string_list(record: &Record, names: &[&str]) -> Vec<String> {
    match field(record, names) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Listing payloads are arrays; some panels send `null` or `{}` when empty.
fn records<'a>(payload: &'a Value, what: &str) -> CatalogResult<Vec<&'a Record>> {
    match payload {
        Value::Array(values) => Ok(values
            .iter()
            .filter_map(|value| {
                let record = value.as_object();
                if record.is_none() {
                    warn!("Skipping non-object {} entry: {}", what, value);
                }
                record
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        other => Err(CatalogError::InvalidResponseShape(format!(
            "expected a list of {}, got {}",
            what,
            type_name(other)
        ))),
    }
}

fn object<'a>(payload: &'a Value, what: &str) -> CatalogResult<&'a Record> {
    payload.as_object().ok_or_else(|| {
        CatalogError::InvalidResponseShape(format!(
            "expected {} object, got {}",
            what,
            type_name(payload)
        ))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn category_of(record: &Record, fallback: Option<&CategoryId>) -> CategoryId {
    string_field(record, &["categoryId", "category_id"])
        .map(CategoryId::new)
        .or_else(|| fallback.cloned())
        .unwrap_or_else(|| CategoryId::new(""))
}

/// Precedence: `id`, `category_id` / `name`, `category_name` / `parentId`,
/// `parent_id`. A parent of `0` means top level.
pub fn categories(kind: ContentKind, payload: &Value) -> CatalogResult<Vec<Category>> {
    let mut result = Vec::new();
    for record in records(payload, "categories")? {
        let Some(id) = string_field(record, &["id", "category_id"]) else {
            warn!("Skipping {} category without id", kind.as_str());
            continue;
        };
        let name = string_field(record, &["name", "category_name"]).unwrap_or_else(|| id.clone());
        let parent_id = string_field(record, &["parentId", "parent_id"]).filter(|p| p != "0");

        result.push(Category {
            id: CategoryId::new(id),
            name,
            parent_id,
            kind,
        });
    }
    Ok(result)
}

fn channel(record: &Record, requested: Option<&CategoryId>) -> Option<Channel> {
    let Some(id) = string_field(record, &["id", "stream_id"]) else {
        warn!(
            "Skipping channel without id: {:?}",
            string_field(record, &["name"])
        );
        return None;
    };

    Some(Channel {
        id: ContentId::new(id),
        name: string_field(record, &["name"]).unwrap_or_default(),
        category_id: category_of(record, requested),
        stream_type: string_field(record, &["streamType", "stream_type"])
            .unwrap_or_else(|| "live".to_string()),
        stream_icon: string_field(record, &["streamIcon", "stream_icon"]),
        epg_channel_id: string_field(record, &["epgChannelId", "epg_channel_id"]),
        added: string_field(record, &["added"]),
        custom_sid: string_field(record, &["customSid", "custom_sid"]),
        tv_archive: u32_field(record, &["tvArchive", "tv_archive"]).unwrap_or(0),
        tv_archive_duration: u32_field(record, &["tvArchiveDuration", "tv_archive_duration"]),
        direct_source: string_field(record, &["directSource", "direct_source"]),
    })
}

fn movie(record: &Record, requested: Option<&CategoryId>) -> Option<Movie> {
    let Some(id) = string_field(record, &["id", "stream_id"]) else {
        warn!(
            "Skipping movie without id: {:?}",
            string_field(record, &["name"])
        );
        return None;
    };

    Some(Movie {
        id: ContentId::new(id),
        name: string_field(record, &["name", "title"]).unwrap_or_default(),
        category_id: category_of(record, requested),
        stream_type: string_field(record, &["streamType", "stream_type"])
            .unwrap_or_else(|| "movie".to_string()),
        stream_icon: string_field(record, &["streamIcon", "stream_icon", "movie_image", "cover"]),
        rating: f32_field(record, &["rating"]),
        year: u32_field(record, &["year"]).or_else(|| year_of(record)),
        added: string_field(record, &["added"]),
        container_extension: string_field(
            record,
            &["containerExtension", "container_extension"],
        )
        .unwrap_or_else(|| "mp4".to_string()),
        custom_sid: string_field(record, &["customSid", "custom_sid"]),
        direct_source: string_field(record, &["directSource", "direct_source"]),
    })
}

fn show(record: &Record, requested: Option<&CategoryId>) -> Option<Show> {
    let Some(id) = string_field(record, &["id", "series_id"]) else {
        warn!(
            "Skipping show without id: {:?}",
            string_field(record, &["name"])
        );
        return None;
    };
    Some(show_with_id(record, ContentId::new(id), requested))
}

fn show_with_id(record: &Record, id: ContentId, requested: Option<&CategoryId>) -> Show {
    Show {
        id,
        name: string_field(record, &["name", "title"]).unwrap_or_default(),
        category_id: category_of(record, requested),
        stream_icon: string_field(record, &["streamIcon", "stream_icon", "cover"]),
        rating: f32_field(record, &["rating"]),
        year: u32_field(record, &["year"]).or_else(|| year_of(record)),
        added: string_field(record, &["added"]),
        last_modified: string_field(record, &["lastModified", "last_modified"]),
    }
}

/// Year prefix of `releaseDate` / `release_date` / `releasedate`.
fn year_of(record: &Record) -> Option<u32> {
    string_field(record, &["releaseDate", "release_date", "releasedate"])
        .and_then(|date| date.get(..4).and_then(|y| y.parse().ok()))
}

/// Stream listing for `kind`. Items without a category id take the
/// requested category, when one was requested.
pub fn items(
    kind: ContentKind,
    payload: &Value,
    requested: Option<&CategoryId>,
) -> CatalogResult<Vec<ContentItem>> {
    let records = records(payload, kind.plural())?;
    let items = records
        .into_iter()
        .filter_map(|record| match kind {
            ContentKind::Channel => channel(record, requested).map(ContentItem::Channel),
            ContentKind::Movie => movie(record, requested).map(ContentItem::Movie),
            ContentKind::Show => show(record, requested).map(ContentItem::Show),
        })
        .collect();
    Ok(items)
}

/// `get_vod_info`: `{ info: {..}, movie_data: {..} }`.
pub fn movie_details(movie_id: &ContentId, payload: &Value) -> CatalogResult<MovieDetails> {
    let document = object(payload, "movie info")?;
    let empty = Record::new();
    let info = document
        .get("info")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let data = document
        .get("movie_data")
        .or_else(|| document.get("movieData"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if info.is_empty() && data.is_empty() {
        return Err(CatalogError::InvalidResponseShape(format!(
            "movie {} has no info",
            movie_id
        )));
    }

    let mut movie = movie(data, None).unwrap_or_else(|| Movie {
        id: movie_id.clone(),
        name: String::new(),
        category_id: category_of(data, None),
        stream_type: "movie".to_string(),
        stream_icon: None,
        rating: None,
        year: None,
        added: None,
        container_extension: "mp4".to_string(),
        custom_sid: None,
        direct_source: None,
    });
    if movie.name.is_empty() {
        movie.name = string_field(info, &["name", "title", "o_name"]).unwrap_or_default();
    }
    if movie.stream_icon.is_none() {
        movie.stream_icon = string_field(info, &["movieImage", "movie_image", "cover_big"]);
    }
    if movie.rating.is_none() {
        movie.rating = f32_field(info, &["rating"]);
    }
    if movie.year.is_none() {
        movie.year = year_of(info);
    }

    Ok(MovieDetails {
        movie,
        plot: string_field(info, &["plot", "description"]),
        cast: string_field(info, &["cast", "actors"]),
        director: string_field(info, &["director"]),
        genre: string_field(info, &["genre"]),
        release_date: string_field(info, &["releaseDate", "release_date", "releasedate"]),
        rating_5based: f32_field(info, &["rating5based", "rating_5based"]),
        backdrop_path: string_list(info, &["backdropPath", "backdrop_path"]),
        youtube_trailer: string_field(info, &["youtubeTrailer", "youtube_trailer"]),
        tmdb_id: string_field(info, &["tmdbId", "tmdb_id", "tmdb"]),
    })
}

fn episode(record: &Record, season_key: Option<u32>) -> Option<Episode> {
    let Some(id) = string_field(record, &["id", "stream_id"]) else {
        warn!(
            "Skipping episode without id: {:?}",
            string_field(record, &["title"])
        );
        return None;
    };

    let empty = Record::new();
    let info = record
        .get("info")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    Some(Episode {
        id: ContentId::new(id),
        episode_num: u32_field(record, &["episodeNum", "episode_num"]).unwrap_or(0),
        season: u32_field(record, &["season"])
            .or(season_key)
            .unwrap_or(0),
        title: string_field(record, &["title", "name"]).unwrap_or_default(),
        container_extension: string_field(
            record,
            &["containerExtension", "container_extension"],
        )
        .unwrap_or_else(|| "mp4".to_string()),
        added: string_field(record, &["added"]),
        custom_sid: string_field(record, &["customSid", "custom_sid"]),
        info: EpisodeInfo {
            movie_image: string_field(info, &["movieImage", "movie_image"]),
            plot: string_field(info, &["plot"]),
            cast: string_field(info, &["cast"]),
            director: string_field(info, &["director"]),
            genre: string_field(info, &["genre"]),
            release_date: string_field(info, &["releaseDate", "release_date", "releasedate"]),
            rating: f32_field(info, &["rating"]),
            tmdb_id: u64_field(info, &["tmdbId", "tmdb_id"]),
            duration_secs: u32_field(info, &["durationSecs", "duration_secs"]),
        },
    })
}

/// `episodes` is either `{ "<season>": [..] }` or a flat list.
fn episodes(payload: Option<&Value>) -> Vec<Episode> {
    match payload {
        Some(Value::Object(by_season)) => by_season
            .iter()
            .flat_map(|(season, list)| {
                let season_key = season.trim().parse::<u32>().ok();
                list.as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_object)
                    .filter_map(move |record| episode(record, season_key))
            })
            .collect(),
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|record| episode(record, None))
            .collect(),
        _ => Vec::new(),
    }
}

/// `get_series_info`: `{ info: {..}, episodes: .. }`.
pub fn show_details(show_id: &ContentId, payload: &Value) -> CatalogResult<ShowDetails> {
    let document = object(payload, "series info")?;
    let info = document
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            CatalogError::InvalidResponseShape(format!("series {} has no info", show_id))
        })?;

    Ok(ShowDetails {
        show: show_with_id(info, show_id.clone(), None),
        plot: string_field(info, &["plot", "description"]),
        cast: string_field(info, &["cast"]),
        director: string_field(info, &["director"]),
        genre: string_field(info, &["genre"]),
        release_date: string_field(info, &["releaseDate", "release_date", "releasedate"]),
        rating_5based: f32_field(info, &["rating5based", "rating_5based"]),
        backdrop_path: string_list(info, &["backdropPath", "backdrop_path"]),
        youtube_trailer: string_field(info, &["youtubeTrailer", "youtube_trailer"]),
        tmdb_id: string_field(info, &["tmdbId", "tmdb_id", "tmdb"]),
        seasons: group_into_seasons(episodes(document.get("episodes"))),
    })
}

/// `user_info` of the account document. A panel answering `auth: 0`
/// rejected the credentials.
pub fn user_info(payload: &Value) -> CatalogResult<UserInfo> {
    let document = object(payload, "account")?;
    let user = document
        .get("user_info")
        .or_else(|| document.get("userInfo"))
        .and_then(Value::as_object)
        .ok_or_else(|| CatalogError::InvalidResponseShape("missing user_info".to_string()))?;

    if bool_field(user, &["auth"]) == Some(false) {
        return Err(CatalogError::InvalidCredentials(
            "server rejected username or password".to_string(),
        ));
    }

    let status = string_field(user, &["status"]);
    let is_active = bool_field(user, &["isActive", "is_active"]).unwrap_or_else(|| {
        status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("active"))
            .unwrap_or(false)
    });

    Ok(UserInfo {
        username: string_field(user, &["username"]).unwrap_or_default(),
        email: string_field(user, &["email"]),
        status,
        exp_date: string_field(user, &["expDate", "exp_date"]),
        is_active,
        created_at: string_field(user, &["createdAt", "created_at"]),
        max_connections: u32_field(user, &["maxConnections", "max_connections"]).unwrap_or(1),
        active_connections: u32_field(user, &["activeCons", "active_cons"]).unwrap_or(0),
        allowed_output_formats: string_list(
            user,
            &["allowedOutputFormats", "allowed_output_formats"],
        ),
    })
}

/// `server_info` of the account document. Missing clock fields default to now.
pub fn server_info(payload: &Value) -> CatalogResult<ServerInfo> {
    let document = object(payload, "account")?;
    let server = document
        .get("server_info")
        .or_else(|| document.get("serverInfo"))
        .and_then(Value::as_object)
        .ok_or_else(|| CatalogError::InvalidResponseShape("missing server_info".to_string()))?;

    let now = chrono::Utc::now();
    Ok(ServerInfo {
        url: string_field(server, &["url"]).unwrap_or_default(),
        port: string_field(server, &["port"]).unwrap_or_default(),
        https_port: string_field(server, &["httpsPort", "https_port"]).unwrap_or_default(),
        server_protocol: string_field(server, &["serverProtocol", "server_protocol"])
            .unwrap_or_default(),
        rtmp_port: string_field(server, &["rtmpPort", "rtmp_port"]).unwrap_or_default(),
        timezone: string_field(server, &["timezone"]).unwrap_or_default(),
        timestamp_now: i64_field(server, &["timestampNow", "timestamp_now"])
            .unwrap_or_else(|| now.timestamp()),
        time_now: string_field(server, &["timeNow", "time_now"])
            .unwrap_or_else(|| now.to_rfc3339()),
    })
}

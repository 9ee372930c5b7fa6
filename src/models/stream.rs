use serde::{Deserialize, Serialize};

use super::Credentials;
use crate::utils::errors::{CatalogError, CatalogResult};

/// Playable stream families, mapped to the server's path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Live,
    Movie,
    Episode,
}

impl StreamKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            StreamKind::Live => "live",
            StreamKind::Movie => "movie",
            StreamKind::Episode => "series",
        }
    }
}

impl std::str::FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" | "channel" => Ok(StreamKind::Live),
            "movie" | "vod" => Ok(StreamKind::Movie),
            "episode" | "series" => Ok(StreamKind::Episode),
            other => Err(format!("unknown stream type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub kind: StreamKind,
    pub stream_id: String,
    pub extension: String,
}

impl StreamRequest {
    pub fn new(kind: StreamKind, stream_id: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            kind,
            stream_id: stream_id.into(),
            extension: extension.into(),
        }
    }
}

/// `{base}/{live|movie|series}/{username}/{password}/{id}.{ext}`
pub fn build_stream_url(credentials: &Credentials, request: &StreamRequest) -> CatalogResult<String> {
    let stream_id = request.stream_id.trim();
    let extension = request.extension.trim().trim_start_matches('.');
    if stream_id.is_empty() || extension.is_empty() {
        return Err(CatalogError::InvalidResponseShape(
            "stream id and extension are required".to_string(),
        ));
    }

    Ok(format!(
        "{}/{}/{}/{}/{}.{}",
        credentials.base_url(),
        request.kind.path_segment(),
        credentials.username,
        credentials.password,
        stream_id,
        extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("http://tv.example.com:8080/player_api.php", "alice", "secret")
    }

    #[test]
    fn test_builds_url_per_kind() {
        let live = build_stream_url(&creds(), &StreamRequest::new(StreamKind::Live, "101", "ts")).unwrap();
        assert_eq!(live, "http://tv.example.com:8080/live/alice/secret/101.ts");

        let movie = build_stream_url(&creds(), &StreamRequest::new(StreamKind::Movie, "7", "mkv")).unwrap();
        assert_eq!(movie, "http://tv.example.com:8080/movie/alice/secret/7.mkv");

        let episode =
            build_stream_url(&creds(), &StreamRequest::new(StreamKind::Episode, "9001", ".mp4")).unwrap();
        assert_eq!(episode, "http://tv.example.com:8080/series/alice/secret/9001.mp4");
    }

    #[test]
    fn test_is_deterministic() {
        let request = StreamRequest::new(StreamKind::Live, "5", "m3u8");
        assert_eq!(
            build_stream_url(&creds(), &request).unwrap(),
            build_stream_url(&creds(), &request).unwrap()
        );
    }

    #[test]
    fn test_rejects_missing_parts() {
        assert!(build_stream_url(&creds(), &StreamRequest::new(StreamKind::Live, "", "ts")).is_err());
        assert!(build_stream_url(&creds(), &StreamRequest::new(StreamKind::Live, "1", " ")).is_err());
    }
}

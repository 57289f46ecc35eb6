// http_client.rs - REST client for the maze web service

use std::time::Duration;

use log::{debug, error};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error_handling::{Result, SyncError};
use crate::types::{MazeRecord, MazeSpec, TileRecord};

// ============= Store Contract =============

/// Remote CRUD surface the sync engine drives.
///
/// Implementations must treat deletes of absent resources as success so
/// the save protocol stays idempotent. `find_maze_by_name` reports a miss
/// as `Ok(None)`; only transport and decode problems are errors.
#[allow(async_fn_in_trait)]
pub trait RemoteMazeStore {
    async fn find_maze_by_name(&self, name: &str) -> Result<Option<MazeRecord>>;

    async fn create_maze(&self, spec: &MazeSpec) -> Result<MazeRecord>;

    /// Creates a maze linked to `original_id` via its originalMazeId field.
    async fn create_secondary_maze(&self, name: &str, original_id: i64) -> Result<MazeRecord>;

    async fn delete_maze(&self, maze_id: i64) -> Result<()>;

    /// Writes one tile. The service keys tiles by (maze, row, column), so
    /// posting an existing cell overwrites it.
    async fn upsert_tile(&self, maze_id: i64, tile: &TileRecord) -> Result<()>;

    async fn delete_tile(&self, maze_id: i64, row: u32, column: u32) -> Result<()>;

    async fn delete_all_tiles(&self, maze_id: i64) -> Result<()>;
}

// ============= Route Construction =============

fn find_maze_path(name: &str) -> String {
    format!("maze/get/by-name/{name}")
}

fn create_maze_path(spec: &MazeSpec) -> String {
    format!("maze/post/{},{},{}", spec.name, spec.rows, spec.columns)
}

fn create_secondary_path(name: &str, original_id: i64) -> String {
    format!("maze/post/secondary-maze/{name},{original_id}")
}

fn delete_maze_path(maze_id: i64) -> String {
    format!("maze/delete/by-id/{maze_id}")
}

fn upsert_tile_path(maze_id: i64, tile: &TileRecord) -> String {
    format!(
        "maze-tile/post/{}/{},{},{},{}",
        maze_id,
        tile.row,
        tile.column,
        tile.kind.code(),
        tile.falloff
    )
}

fn delete_tile_path(maze_id: i64, row: u32, column: u32) -> String {
    format!("maze-tile/delete/{maze_id}/{row},{column}")
}

fn delete_all_tiles_path(maze_id: i64) -> String {
    format!("maze-tile/delete/all/{maze_id}")
}

// ============= HTTP Implementation =============

/// Request body for secondary maze creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecondaryMazeSpec<'a> {
    name: &'a str,
    original_maze_id: i64,
}

fn remote_failure(url: &str, message: impl ToString) -> SyncError {
    let err = SyncError::remote(url, message);
    error!("{err}");
    err
}

fn decode_maze_body(body: &str, url: &str) -> Result<MazeRecord> {
    serde_json::from_str(body).map_err(|err| {
        let err = SyncError::malformed(url, err);
        error!("{err}");
        err
    })
}

/// `RemoteMazeStore` over the maze web service's REST API.
pub struct HttpMazeStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMazeStore {
    /// Builds a client rooted at `base_url` (e.g. `http://localhost:5216/api`).
    /// Every request shares the one timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpMazeStore { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Issues a DELETE. A 404 counts as success: the resource is gone
    /// either way.
    async fn delete(&self, url: String) -> Result<()> {
        debug!("DELETE {url}");
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(remote_failure(&url, format!("unexpected status {status}")))
        }
    }
}

impl RemoteMazeStore for HttpMazeStore {
    async fn find_maze_by_name(&self, name: &str) -> Result<Option<MazeRecord>> {
        let url = self.endpoint(&find_maze_path(name));
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(remote_failure(&url, format!("unexpected status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode_maze_body(&body, &url).map(Some)
    }

    async fn create_maze(&self, spec: &MazeSpec) -> Result<MazeRecord> {
        let url = self.endpoint(&create_maze_path(spec));
        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .json(spec)
            .send()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote_failure(&url, format!("unexpected status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        if !body.trim().is_empty() {
            return decode_maze_body(&body, &url);
        }
        // The service acked without echoing the record, so fetch the
        // assigned id by name.
        match self.find_maze_by_name(&spec.name).await? {
            Some(record) => Ok(record),
            None => Err(remote_failure(
                &url,
                "maze creation acknowledged but the record is missing",
            )),
        }
    }

    async fn create_secondary_maze(&self, name: &str, original_id: i64) -> Result<MazeRecord> {
        let url = self.endpoint(&create_secondary_path(name, original_id));
        debug!("POST {url}");
        let payload = SecondaryMazeSpec {
            name,
            original_maze_id: original_id,
        };
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote_failure(&url, format!("unexpected status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        if !body.trim().is_empty() {
            return decode_maze_body(&body, &url);
        }
        match self.find_maze_by_name(name).await? {
            Some(record) => Ok(record),
            None => Err(remote_failure(
                &url,
                "secondary maze creation acknowledged but the record is missing",
            )),
        }
    }

    async fn delete_maze(&self, maze_id: i64) -> Result<()> {
        self.delete(self.endpoint(&delete_maze_path(maze_id))).await
    }

    async fn upsert_tile(&self, maze_id: i64, tile: &TileRecord) -> Result<()> {
        let url = self.endpoint(&upsert_tile_path(maze_id, tile));
        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(remote_failure(&url, format!("unexpected status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|err| remote_failure(&url, err))?;
        // The service echoes the stored record; an empty 2xx ack counts
        // as a failed write.
        if body.trim().is_empty() {
            return Err(remote_failure(&url, "empty acknowledgement for tile write"));
        }
        Ok(())
    }

    async fn delete_tile(&self, maze_id: i64, row: u32, column: u32) -> Result<()> {
        self.delete(self.endpoint(&delete_tile_path(maze_id, row, column)))
            .await
    }

    async fn delete_all_tiles(&self, maze_id: i64) -> Result<()> {
        self.delete(self.endpoint(&delete_all_tiles_path(maze_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TileKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answers exactly one request on a fresh local port with the canned
    /// response, then closes the connection. Returns the base URL.
    fn one_shot_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 512];
            let mut request = Vec::new();
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    fn store_at(base: String) -> HttpMazeStore {
        HttpMazeStore::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_route_construction() {
        assert_eq!(find_maze_path("maze8x8"), "maze/get/by-name/maze8x8");
        let spec = MazeSpec {
            name: "maze4x6".to_string(),
            rows: 4,
            columns: 6,
            tile_density: 50,
            tile_offset: 1,
        };
        assert_eq!(create_maze_path(&spec), "maze/post/maze4x6,4,6");
        assert_eq!(
            create_secondary_path("maze4x6", 17),
            "maze/post/secondary-maze/maze4x6,17"
        );
        assert_eq!(delete_maze_path(17), "maze/delete/by-id/17");
        assert_eq!(delete_tile_path(17, 2, 3), "maze-tile/delete/17/2,3");
        assert_eq!(delete_all_tiles_path(17), "maze-tile/delete/all/17");
    }

    #[test]
    fn test_upsert_tile_path_encodes_kind_and_falloff() {
        let tile = TileRecord::new(2, 3, TileKind::Hole, 40);
        assert_eq!(upsert_tile_path(7, &tile), "maze-tile/post/7/2,3,H,40");
    }

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let store =
            HttpMazeStore::new("http://localhost:5216/api/", Duration::from_secs(10)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5216/api");
        assert_eq!(
            store.endpoint(&find_maze_path("m")),
            "http://localhost:5216/api/maze/get/by-name/m"
        );
    }

    #[test]
    fn test_decode_maze_body_reports_url() {
        let err = decode_maze_body("not json", "http://host/api/maze/get/by-name/m").unwrap_err();
        match err {
            SyncError::MalformedPayload { url, .. } => {
                assert_eq!(url, "http://host/api/maze/get/by-name/m");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_secondary_spec_serializes_camel_case() {
        let body = SecondaryMazeSpec {
            name: "maze8x8",
            original_maze_id: 12,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"name":"maze8x8","originalMazeId":12}"#);
    }

    #[tokio::test]
    async fn test_find_maze_decodes_service_body() {
        let base = one_shot_server(
            "HTTP/1.1 200 OK\r\nconnection: close\r\n\r\n{\"mazeId\":4,\"name\":\"maze8x8\"}",
        );
        let found = store_at(base).find_maze_by_name("maze8x8").await.unwrap();
        let maze = found.unwrap();
        assert_eq!(maze.maze_id, 4);
        assert_eq!(maze.name, "maze8x8");
        assert!(maze.maze_tiles.is_empty());
    }

    #[tokio::test]
    async fn test_find_maze_maps_miss_responses_to_none() {
        for response in [
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            "HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ] {
            let base = one_shot_server(response);
            let found = store_at(base).find_maze_by_name("maze8x8").await.unwrap();
            assert!(found.is_none(), "response {response:?}");
        }
    }

    #[tokio::test]
    async fn test_upsert_tile_rejects_empty_ack() {
        let base = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        );
        let tile = TileRecord::new(1, 2, TileKind::Wall, 30);
        let err = store_at(base).upsert_tile(7, &tile).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_delete_treats_missing_resource_as_success() {
        let base = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        );
        store_at(base).delete_tile(9, 1, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_surfaces_unexpected_status() {
        let base = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        );
        let err = store_at(base).delete_maze(3).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
    }
}

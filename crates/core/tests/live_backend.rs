//! Integration tests against a real S3-compatible backend.
//!
//! Ignored by default. To run them, point the `STOWAGE_IT_*` variables at a
//! disposable bucket (AWS S3, R2, or a local MinIO) and run
//! `cargo test -p stowage-core --test live_backend -- --ignored`:
//!
//! - `STOWAGE_IT_PROVIDER` (`s3` or `r2`, default `s3`)
//! - `STOWAGE_IT_ENDPOINT` (required for `r2`)
//! - `STOWAGE_IT_REGION` (default `us-east-1`)
//! - `STOWAGE_IT_ACCESS_KEY_ID`, `STOWAGE_IT_SECRET_ACCESS_KEY`, `STOWAGE_IT_BUCKET`

use std::collections::HashSet;
use std::time::Duration;

use stowage_core::storage::{
    ListRequest, PresignedUrlRequest, StorageProvider, StorageService, UploadRequest,
};
use stowage_shared::StorageSettings;
use uuid::Uuid;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// `None` when the live backend is not configured.
fn live_service() -> Option<StorageService> {
    let settings = StorageSettings {
        provider: env("STOWAGE_IT_PROVIDER").unwrap_or_else(|| "s3".to_string()),
        endpoint: env("STOWAGE_IT_ENDPOINT"),
        region: env("STOWAGE_IT_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        access_key_id: env("STOWAGE_IT_ACCESS_KEY_ID")?,
        secret_access_key: env("STOWAGE_IT_SECRET_ACCESS_KEY")?,
        bucket: env("STOWAGE_IT_BUCKET")?,
        public_url: None,
    };
    Some(StorageService::from_settings(&settings).expect("live settings should resolve"))
}

/// Unique prefix so concurrent runs never see each other's objects.
fn run_prefix() -> String {
    format!("stowage-it/{}/", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires a live S3-compatible backend"]
async fn live_round_trip_and_existence() {
    let Some(service) = live_service() else {
        eprintln!("STOWAGE_IT_* not set, skipping");
        return;
    };
    let key = format!("{}hello.txt", run_prefix());

    assert!(!service.exists(&key).await.expect("exists"));
    assert!(service.get(&key).await.unwrap_err().is_not_found());

    let uploaded = service
        .upload(
            UploadRequest::new(key.clone(), "hello live backend")
                .with_content_type("text/plain")
                .with_metadata("owner", "42")
                .with_metadata("purpose", "round-trip"),
        )
        .await
        .expect("upload");
    assert!(uploaded.etag.is_some());

    let fetched = service.get(&key).await.expect("get");
    assert_eq!(fetched.content_type.as_deref(), Some("text/plain"));
    assert_eq!(fetched.content_length, 18);
    assert_eq!(fetched.metadata.get("owner").map(String::as_str), Some("42"));
    assert_eq!(
        fetched.metadata.get("purpose").map(String::as_str),
        Some("round-trip")
    );
    assert!(fetched.last_modified.is_some());
    let body = fetched.body.collect_bytes().await.expect("body");
    assert_eq!(&body[..], b"hello live backend");

    assert!(service.exists(&key).await.expect("exists"));
    service.delete(&key).await.expect("delete");
    assert!(!service.exists(&key).await.expect("exists"));
    service.delete(&key).await.expect("idempotent delete");
}

#[tokio::test]
#[ignore = "requires a live S3-compatible backend"]
async fn live_pagination_covers_every_key_once() {
    let Some(service) = live_service() else {
        eprintln!("STOWAGE_IT_* not set, skipping");
        return;
    };
    let prefix = run_prefix();
    for i in 1..=5 {
        service
            .upload(UploadRequest::new(format!("{prefix}{i}"), "x"))
            .await
            .expect("upload");
    }

    // S3 lists in key order, so every page is known exactly. Pages after the
    // first go through the server-side `start_after` resume.
    let key = |i: u32| format!("{prefix}{i}");
    let mut request = ListRequest::prefix(prefix.clone()).with_max_keys(2);
    let mut pages: Vec<Vec<String>> = Vec::new();
    loop {
        let page = service.list(request.clone()).await.expect("page");
        assert_eq!(page.truncated, page.cursor.is_some());
        pages.push(page.objects.into_iter().map(|o| o.key).collect());
        match page.cursor {
            Some(cursor) => request = request.with_cursor(cursor),
            None => break,
        }
    }

    assert_eq!(
        pages,
        vec![vec![key(1), key(2)], vec![key(3), key(4)], vec![key(5)]]
    );

    let seen: Vec<String> = pages.into_iter().flatten().collect();
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 5);

    for key in &seen {
        service.delete(key).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore = "requires a live S3-compatible backend; sleeps for 61 seconds"]
async fn live_presigned_url_expires() {
    let Some(service) = live_service() else {
        eprintln!("STOWAGE_IT_* not set, skipping");
        return;
    };
    let key = format!("{}expiring.txt", run_prefix());
    service
        .upload(UploadRequest::new(key.clone(), "short-lived"))
        .await
        .expect("upload");

    let signed = service
        .presigned_url(PresignedUrlRequest::new(key.clone()).with_ttl_secs(60))
        .await
        .expect("sign");

    let http = reqwest::Client::new();
    let fresh = http.get(&signed.url).send().await.expect("request");
    assert!(fresh.status().is_success());
    assert_eq!(fresh.text().await.expect("body"), "short-lived");

    tokio::time::sleep(Duration::from_secs(61)).await;

    let stale = http.get(&signed.url).send().await.expect("request");
    assert_eq!(stale.status().as_u16(), 403);

    service.delete(&key).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires a live S3-compatible backend"]
async fn live_presigned_upload_url_only_accepts_its_content_type() {
    let Some(service) = live_service() else {
        eprintln!("STOWAGE_IT_* not set, skipping");
        return;
    };
    let key = format!("{}direct.png", run_prefix());

    let signed = service
        .presigned_upload_url(PresignedUrlRequest::new(key.clone()).with_content_type("image/png"))
        .await
        .expect("sign");

    let http = reqwest::Client::new();

    // The signature covers the content type.
    let mismatched = http
        .put(&signed.url)
        .header("content-type", "text/html")
        .body("<script></script>")
        .send()
        .await
        .expect("request");
    assert_eq!(mismatched.status().as_u16(), 403);
    assert!(!service.exists(&key).await.expect("exists"));

    let mut put = http.put(&signed.url).body(vec![0x89u8, b'P', b'N', b'G']);
    for (name, value) in &signed.headers {
        put = put.header(name, value);
    }
    let response = put.send().await.expect("request");
    assert!(response.status().is_success());

    let fetched = service.get(&key).await.expect("get");
    assert_eq!(fetched.content_type.as_deref(), Some("image/png"));

    service.delete(&key).await.expect("cleanup");
}

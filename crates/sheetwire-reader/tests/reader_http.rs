//! End-to-end tests: reader endpoints driving a live generator instance.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use sheetwire_generator::GeneratorState;
use sheetwire_reader::{build_router, FetchConfig, ReaderState};
use tokio::io::AsyncReadExt;

/// Serve a generator on an ephemeral port.
async fn spawn_generator() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = sheetwire_generator::build_router(GeneratorState::new());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok(addr)
}

/// Serve a reader pointed at the given upstream config.
async fn spawn_reader(config: FetchConfig) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ReaderState::new(&config)?;
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    Ok(format!("http://{addr}"))
}

/// Generator plus reader wired together; returns the reader base URL.
async fn spawn_pipeline() -> Result<String> {
    let generator = spawn_generator().await?;
    spawn_reader(FetchConfig::for_base_url(format!("http://{generator}"))).await
}

/// An upstream that accepts connections and then stays silent.
async fn spawn_stalled_upstream() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut sink = [0u8; 1024];
                while let Ok(read) = socket.read(&mut sink).await {
                    if read == 0 {
                        return;
                    }
                }
            });
        }
    });
    Ok(addr)
}

async fn fetch_json(url: &str) -> Result<(u16, Value)> {
    let response = reqwest::get(url).await?;
    let status = response.status().as_u16();
    let body = response.json().await?;
    Ok((status, body))
}

fn expected_headers() -> Value {
    serde_json::json!(["ID", "姓名", "部門", "薪資", "入職日期", "狀態"])
}

#[tokio::test]
async fn test_request_and_read_reports_sample_summary() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/request-and-read")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["operation"], "request-and-read");
    assert_eq!(body["service"], "sheetwire-reader");
    assert!(body["timestamp"].is_string());

    assert_eq!(body["transfer"]["strategy"], "buffered");
    assert!(body["transfer"]["byte_count"].as_u64().unwrap() > 0);
    assert!(body["transfer"]["size_display"].as_str().unwrap().ends_with(" KB"));

    let sheet = &body["summary"]["sheets"][0];
    assert_eq!(body["summary"]["sheet_count"], 1);
    assert_eq!(sheet["name"], "Sample Data");
    assert_eq!(sheet["headers"], expected_headers());
    assert_eq!(sheet["total_rows"], 11);
    assert_eq!(sheet["data_rows"], 10);
    assert_eq!(sheet["sample_rows"].as_array().unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_request_resource_and_read_echoes_download_headers() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/request-resource-and-read")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["transfer"]["strategy"], "resourced");
    assert_eq!(
        body["transfer"]["content_length"],
        body["transfer"]["byte_count"]
    );
    assert_eq!(
        body["transfer"]["content_disposition"],
        "attachment; filename=\"report.xlsx\""
    );
    assert_eq!(body["summary"]["sheets"][0]["data_rows"], 10);
    Ok(())
}

#[tokio::test]
async fn test_request_stream_and_read_omits_length() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/request-stream-and-read")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["transfer"]["strategy"], "streaming");
    assert!(body["transfer"].get("content_length").is_none());
    assert_eq!(
        body["transfer"]["content_disposition"],
        "attachment; filename=\"report.xlsx\""
    );
    assert_eq!(body["summary"]["sheets"][0]["headers"], expected_headers());
    Ok(())
}

#[tokio::test]
async fn test_report_type_is_forwarded_upstream() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/request-and-read?type=report")).await?;
    assert_eq!(status, 200);

    let sheet = &body["summary"]["sheets"][0];
    assert_eq!(sheet["headers"].as_array().unwrap().len(), 1);
    assert!(sheet["headers"][0].as_str().unwrap().starts_with("月度 報表 - "));
    assert_eq!(sheet["data_rows"], 6);
    Ok(())
}

#[tokio::test]
async fn test_generate_and_read_sample_round_trip() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/generate-and-read-sample")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["operation"], "generate-and-read-sample");

    assert_eq!(body["header_validation"]["result"], "PASSED");
    assert_eq!(
        body["header_validation"]["message"],
        "all 6 header labels match"
    );

    assert_eq!(body["transfer"]["strategy"], "streaming");
    assert_eq!(
        body["transfer"]["content_disposition"],
        "attachment; filename=\"filled_data.xlsx\""
    );
    assert_eq!(body["summary"]["sheets"][0]["headers"], expected_headers());
    assert_eq!(body["summary"]["sheets"][0]["data_rows"], 10);
    Ok(())
}

#[tokio::test]
async fn test_upstream_error_maps_to_bad_gateway() -> Result<()> {
    let generator = spawn_generator().await?;
    // Wrong path prefix: every upstream call 404s.
    let reader = spawn_reader(FetchConfig::for_base_url(format!("http://{generator}/nope"))).await?;

    let (status, body) = fetch_json(&format!("{reader}/request-and-read")).await?;
    assert_eq!(status, 502);
    assert_eq!(body["status"], "error");
    assert_eq!(body["operation"], "request-and-read");
    assert!(body["error"].as_str().unwrap().contains("404"));
    Ok(())
}

#[tokio::test]
async fn test_timeout_maps_to_gateway_timeout() -> Result<()> {
    let stalled = spawn_stalled_upstream().await?;
    let mut config = FetchConfig::for_base_url(format!("http://{stalled}"));
    config.read_timeout = Duration::from_millis(300);
    let reader = spawn_reader(config).await?;

    let started = Instant::now();
    let (status, body) = fetch_json(&format!("{reader}/request-stream-and-read")).await?;

    assert_eq!(status, 504);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    // The deadline fired, not some longer hang.
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[tokio::test]
async fn test_service_info() -> Result<()> {
    let reader = spawn_pipeline().await?;

    let (status, body) = fetch_json(&format!("{reader}/")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["service"], "sheetwire-reader");
    assert!(body["version"].is_string());
    Ok(())
}

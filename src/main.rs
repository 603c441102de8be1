// src/main.rs

use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use zeroize::Zeroizing;

use repo_cloner::{CloneRequest, CloneResponse, CloneService, ClonerConfig, telemetry};

/// Reads one JSON `CloneRequest` from stdin and writes one JSON reply to stdout.
#[tokio::main]
async fn main() -> ExitCode {
    // ==============================================================================
    // 1. Configuration & Environment
    // ==============================================================================

    telemetry::init();
    let config = match ClonerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    // ==============================================================================
    // 2. Request Intake
    // ==============================================================================

    // The payload may carry a token; wipe the raw bytes once parsed.
    let mut raw = Zeroizing::new(Vec::new());
    if let Err(e) = tokio::io::stdin().read_to_end(&mut raw).await {
        tracing::error!(error = %e, "failed to read request from stdin");
        return ExitCode::from(2);
    }

    let request: CloneRequest = match serde_json::from_slice(&raw) {
        Ok(request) => request,
        Err(e) => {
            // Only position and category: the message itself may quote a value.
            tracing::error!(
                category = ?e.classify(),
                line = e.line(),
                column = e.column(),
                "malformed clone request"
            );
            return ExitCode::from(2);
        }
    };
    drop(raw);

    // ==============================================================================
    // 3. Execution & Reply
    // ==============================================================================

    let service = CloneService::new(config);
    let (response, code) = match service.clone_repository(request).await {
        Ok(result) => (CloneResponse::from(&result), ExitCode::SUCCESS),
        Err(e) => (CloneResponse::from(&e), ExitCode::FAILURE),
    };

    let body = match serde_json::to_vec(&response) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode reply");
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = tokio::io::stdout();
    if stdout.write_all(&body).await.is_err() || stdout.write_all(b"\n").await.is_err() {
        return ExitCode::FAILURE;
    }
    let _ = stdout.flush().await;
    code
}

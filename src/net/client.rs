use crate::api::ApiResponse;
use crate::errors::{AppError, AppResult};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Send one request to a running daemon and wait for its response line.
pub fn send_request(addr: &str, request: &Value) -> AppResult<ApiResponse> {
    let mut stream = TcpStream::connect(addr)
        .map_err(|e| AppError::Protocol(format!("Cannot reach parkmon at {}: {}", addr, e)))?;
    stream.set_read_timeout(Some(RESPONSE_TIMEOUT))?;

    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    stream.write_all(&line)?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    if reader.read_line(&mut response)? == 0 {
        return Err(AppError::Protocol("connection closed without a response".into()));
    }

    Ok(serde_json::from_str(response.trim())?)
}

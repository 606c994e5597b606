use crate::api::{ApiResponse, handle_line};
use crate::core::ParkingService;
use crate::errors::{AppError, AppResult};
use crate::net::MAX_LINE_BYTES;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause between accept attempts while no client is connecting.
const ACCEPT_IDLE: Duration = Duration::from_millis(50);

/// Read timeout on client sockets, so handlers notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub struct CommandServer {
    listener: TcpListener,
    service: Arc<ParkingService>,
    running: Arc<AtomicBool>,
}

impl CommandServer {
    pub fn bind(
        addr: &str,
        service: Arc<ParkingService>,
        running: Arc<AtomicBool>,
    ) -> AppResult<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| AppError::Protocol(format!("Failed to bind to {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            service,
            running,
        })
    }

    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until the running flag clears.
    pub fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            log::info!("Command server listening on {}", addr);
        }

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        log::error!("Failed to set socket to blocking mode: {}", e);
                        continue;
                    }

                    let service = Arc::clone(&self.service);
                    let running = Arc::clone(&self.running);
                    let spawned = thread::Builder::new()
                        .name("parkmon-client".to_string())
                        .spawn(move || {
                            log::debug!("Client connected: {}", peer);
                            if let Err(e) = serve_connection(stream, &service, &running) {
                                log::warn!("Client {} dropped: {}", peer, e);
                            }
                            log::debug!("Client disconnected: {}", peer);
                        });
                    if let Err(e) = spawned {
                        log::error!("Failed to spawn client handler: {}", e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_IDLE);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }

        log::info!("Command server stopped");
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("parkmon-server".to_string())
            .spawn(move || self.run())
    }
}

fn serve_connection(
    stream: TcpStream,
    service: &ParkingService,
    running: &AtomicBool,
) -> AppResult<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::new();

    while running.load(Ordering::Relaxed) {
        // never buffer more than one byte past the cap
        let budget = (MAX_LINE_BYTES + 1).saturating_sub(buf.len()) as u64;
        match (&mut reader).take(budget).read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let complete = buf.last() == Some(&b'\n');
                if buf.len() > MAX_LINE_BYTES + usize::from(complete) {
                    write_response(&mut writer, &oversized())?;
                    break;
                }
                respond(&mut writer, service, &buf)?;
                if !complete {
                    // EOF in the middle of a line
                    break;
                }
                buf.clear();
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                // partial line stays in `buf`
                if buf.len() > MAX_LINE_BYTES {
                    write_response(&mut writer, &oversized())?;
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset) => {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let _ = writer.shutdown(Shutdown::Both);
    Ok(())
}

fn respond(writer: &mut TcpStream, service: &ParkingService, raw: &[u8]) -> AppResult<()> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let response = handle_line(service, line);
    write_response(writer, &response)
}

fn write_response(writer: &mut TcpStream, response: &ApiResponse) -> AppResult<()> {
    let mut out = serde_json::to_vec(response)?;
    out.push(b'\n');
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(())
}

fn oversized() -> ApiResponse {
    ApiResponse::from(&AppError::Protocol(format!(
        "request line longer than {} bytes",
        MAX_LINE_BYTES
    )))
}

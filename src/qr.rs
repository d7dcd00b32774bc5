//! Startup banner with an optional QR code of the server URL.
//!
//! Scanning the code opens the organizer on a phone on the same network.

use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use colored::Colorize;
use qrcode::{Color, QrCode};

/// URL a browser should open. Wildcard binds advertise the LAN address.
pub fn server_url(addr: SocketAddr) -> String {
    let ip = if addr.ip().is_unspecified() {
        local_ip_address::local_ip().unwrap_or(addr.ip())
    } else {
        addr.ip()
    };
    match ip {
        IpAddr::V4(v4) => format!("http://{}:{}/", v4, addr.port()),
        IpAddr::V6(v6) => format!("http://[{}]:{}/", v6, addr.port()),
    }
}

pub fn display_server_banner(addr: SocketAddr, root: &Path, show_qr: bool) {
    let url = server_url(addr);

    println!();
    println!("  {}", "mediasorter".cyan().bold());
    println!("  {} {}", "Sorting:".dimmed(), root.display());

    if show_qr {
        println!();
        println!("  {}", "Scan to open on your phone:".cyan().bold());
        match render_half_blocks(&url) {
            Some(lines) => {
                let mut stdout = std::io::stdout();
                for line in lines {
                    let _ = writeln!(stdout, "  {}", line);
                }
                let _ = stdout.flush();
            }
            None => println!("  (QR generation failed - use URL below)"),
        }
    }

    println!();
    println!("  {} {}", "Open:".dimmed(), url.green());
    println!();
}

/// Render `data` as QR rows of Unicode half blocks (two modules per line)
fn render_half_blocks(data: &str) -> Option<Vec<String>> {
    let code = QrCode::new(data.as_bytes()).ok()?;
    let width = code.width();
    let dark = |x: usize, y: usize| y < width && code[(x, y)] == Color::Dark;

    let lines = (0..width)
        .step_by(2)
        .map(|y| {
            (0..width)
                .map(|x| match (dark(x, y), dark(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect();
    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_loopback_bind() {
        let addr: SocketAddr = "127.0.0.1:8001".parse().unwrap();
        assert_eq!(server_url(addr), "http://127.0.0.1:8001/");

        let addr: SocketAddr = "[::1]:9000".parse().unwrap();
        assert_eq!(server_url(addr), "http://[::1]:9000/");
    }

    #[test]
    fn wildcard_bind_keeps_port() {
        let addr: SocketAddr = "0.0.0.0:8001".parse().unwrap();
        let url = server_url(addr);
        assert!(url.starts_with("http://"));
        assert!(url.ends_with(":8001/"));
    }

    #[test]
    fn qr_rows_cover_two_modules_each() {
        let lines = render_half_blocks("http://127.0.0.1:8001/").unwrap();
        let width = QrCode::new(b"http://127.0.0.1:8001/").unwrap().width();
        assert_eq!(lines.len(), width.div_ceil(2));
        assert!(lines.iter().all(|line| line.chars().count() == width));
    }
}

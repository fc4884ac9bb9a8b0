//! Hand-written HTTP/1.1 responders for body behaviour wiremock cannot model:
//! bodies that arrive slowly and bodies cut off before `Content-Length`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Sends `body` one byte at a time with `interval` between bytes.
pub fn start_trickle(body: &'static [u8], interval: Duration) -> String {
    serve(move |mut stream| {
        let _ = stream.write_all(headers(body.len()).as_bytes());
        for byte in body {
            thread::sleep(interval);
            if stream.write_all(&[*byte]).is_err() {
                return;
            }
            let _ = stream.flush();
        }
    })
}

/// Announces `declared_len` bytes, sends `sent`, then closes the connection.
pub fn start_truncated(declared_len: usize, sent: &'static [u8]) -> String {
    serve(move |mut stream| {
        let _ = stream.write_all(headers(declared_len).as_bytes());
        let _ = stream.write_all(sent);
        let _ = stream.flush();
        // Give the client time to take the partial chunk before the close.
        thread::sleep(Duration::from_millis(100));
    })
}

fn headers(content_length: usize) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
    )
}

/// Accepts connections forever, one thread each. Returns the base URL.
fn serve<F>(respond: F) -> String
where
    F: Fn(TcpStream) + Send + Sync + Copy + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut stream = stream;
                let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
                let mut buf = [0u8; 4096];
                if matches!(stream.read(&mut buf), Ok(0) | Err(_)) {
                    return;
                }
                respond(stream);
            });
        }
    });
    format!("http://127.0.0.1:{port}")
}

//! QueryTransport trait and TcpTransport (blocking TCP with bounded
//! timeouts). The trait enables mock injection for testing the typed
//! client without a server.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::QueryError;
use crate::wire::parse_status_line;

/// Default connect/read/write timeout. A stalled remote call surfaces as
/// an IO error instead of blocking the poll loop forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for executing ServerQuery commands. Sends one command line and
/// returns the response data lines; the result line is consumed and a
/// non-zero id surfaces as [`QueryError::Command`].
pub trait QueryTransport {
    fn exec(&mut self, command: &str) -> Result<Vec<String>, QueryError>;
}

/// Real transport over a single shared TCP connection, used serially.
#[derive(Debug)]
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpTransport {
    /// Connect, apply timeouts, and consume the `TS3` greeting banner plus
    /// its welcome line.
    pub fn connect(addr: &str) -> Result<Self, QueryError> {
        Self::connect_with_timeout(addr, DEFAULT_TIMEOUT)
    }

    pub fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self, QueryError> {
        let resolved = addr.to_socket_addrs()?.next().ok_or_else(|| {
            QueryError::Protocol(format!("address {addr:?} did not resolve"))
        })?;
        let stream = TcpStream::connect_timeout(&resolved, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let writer = stream.try_clone()?;
        let mut transport = Self {
            reader: BufReader::new(stream),
            writer,
        };

        let banner = transport.read_line()?;
        if banner != "TS3" {
            return Err(QueryError::Protocol(format!(
                "unexpected greeting {banner:?}, expected \"TS3\""
            )));
        }
        // Welcome line ("Welcome to the TeamSpeak 3 ServerQuery interface…").
        transport.read_line()?;

        Ok(transport)
    }

    /// Read one line, trimming the server's `\n\r` terminator (the CR of
    /// the previous line may lead the next one).
    fn read_line(&mut self) -> Result<String, QueryError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(QueryError::Protocol("connection closed by server".into()));
        }
        Ok(line.trim_matches(['\r', '\n']).to_string())
    }
}

impl QueryTransport for TcpTransport {
    fn exec(&mut self, command: &str) -> Result<Vec<String>, QueryError> {
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line.is_empty() {
                continue;
            }
            if let Some(status) = parse_status_line(&line) {
                if status.is_ok() {
                    return Ok(lines);
                }
                return Err(QueryError::Command {
                    id: status.id,
                    msg: status.msg,
                });
            }
            lines.push(line);
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn serve(responses: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            stream
                .write_all(b"TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface\n\r")
                .expect("greeting");
            let mut buf = [0u8; 1024];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                stream.write_all(responses.as_bytes()).expect("respond");
            }
        });
        addr
    }

    #[test]
    fn exec_collects_data_lines_until_ok() {
        let addr = serve("clid=1 cid=2\n\rerror id=0 msg=ok\n\r");
        let mut transport = TcpTransport::connect(&addr).expect("connect");
        let lines = transport.exec("clientlist").expect("exec");
        assert_eq!(lines, vec!["clid=1 cid=2".to_string()]);
    }

    #[test]
    fn exec_surfaces_command_error() {
        let addr = serve("error id=520 msg=invalid\\sloginname\\sor\\spassword\n\r");
        let mut transport = TcpTransport::connect(&addr).expect("connect");
        match transport.exec("login a b") {
            Err(QueryError::Command { id, msg }) => {
                assert_eq!(id, 520);
                assert_eq!(msg, "invalid loginname or password");
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn bad_greeting_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            stream.write_all(b"SSH-2.0\n").expect("greeting");
        });
        match TcpTransport::connect(&addr) {
            Err(QueryError::Protocol(msg)) => assert!(msg.contains("greeting")),
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }
}

use crate::commands::stop::DaemonClient;
use crate::error::BoxError;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

pub const SOCKET_PATH: &str = "/var/tmp/cfdevd.socket";

const MAGIC: &[u8; 5] = b"CFD3V";
const CLIENT_NAME: &str = "cfdev";
const UNINSTALL: u8 = 1;
const STATUS_OK: u8 = 0;
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the privileged cfdevd helper listening on a unix socket.
pub struct CfdevdClient {
    socket: PathBuf,
}

impl CfdevdClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        CfdevdClient {
            socket: socket.into(),
        }
    }

    fn connect(&self) -> io::Result<UnixStream> {
        let stream = UnixStream::connect(&self.socket)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        Ok(stream)
    }
}

impl Default for CfdevdClient {
    fn default() -> Self {
        CfdevdClient::new(SOCKET_PATH)
    }
}

impl DaemonClient for CfdevdClient {
    fn uninstall(&self) -> Result<String, BoxError> {
        let mut stream = match self.connect() {
            Ok(stream) => stream,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                log::debug!("cfdevd is not listening on {}: {}", self.socket.display(), err);
                return Ok("cfdevd not installed".to_string());
            }
            Err(err) => {
                return Err(format!("connecting to {}: {}", self.socket.display(), err).into())
            }
        };

        let server = handshake(&mut stream)?;
        log::info!("Uninstalling {}...", server);
        stream.write_all(&[UNINSTALL])?;

        match read_byte(&mut stream)? {
            STATUS_OK => Ok(server),
            code => {
                let message = read_string(&mut stream)?;
                Err(format!("{} refused uninstall ({}): {}", server, code, message).into())
            }
        }
    }
}

fn handshake(stream: &mut UnixStream) -> Result<String, BoxError> {
    let mut hello = Vec::with_capacity(MAGIC.len() + 1 + CLIENT_NAME.len());
    hello.extend_from_slice(MAGIC);
    write_string(&mut hello, CLIENT_NAME)?;
    stream.write_all(&hello)?;
    read_string(stream)
}

fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<(), BoxError> {
    let len = u8::try_from(value.len()).map_err(|_| format!("string too long: {}", value))?;
    buf.push(len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn read_byte(stream: &mut impl Read) -> Result<u8, BoxError> {
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_string(stream: &mut impl Read) -> Result<String, BoxError> {
    let len = read_byte(stream)? as usize;
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data)?;
    Ok(String::from_utf8(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::thread;

    fn socket_path() -> PathBuf {
        // Keep it short; unix socket paths are length limited.
        let id = uuid::Uuid::new_v4().simple().to_string();
        std::env::temp_dir().join(format!("cfdevd-{}.sock", &id[..8]))
    }

    /// Serve one connection, answering the uninstall command with `reply`.
    fn serve_once(path: &PathBuf, reply: Vec<u8>) -> thread::JoinHandle<u8> {
        let listener = UnixListener::bind(path).unwrap();
        thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut magic = [0u8; 5];
            conn.read_exact(&mut magic).unwrap();
            assert_eq!(&magic, MAGIC);
            assert_eq!(read_string(&mut conn).unwrap(), CLIENT_NAME);

            let mut hello = Vec::new();
            write_string(&mut hello, "cfdevd-test").unwrap();
            conn.write_all(&hello).unwrap();

            let command = read_byte(&mut conn).unwrap();
            conn.write_all(&reply).unwrap();
            command
        })
    }

    #[test]
    fn uninstall_sends_command_and_returns_server_name() {
        let path = socket_path();
        let server = serve_once(&path, vec![STATUS_OK]);

        let name = CfdevdClient::new(&path).uninstall().unwrap();
        assert_eq!(name, "cfdevd-test");
        assert_eq!(server.join().unwrap(), UNINSTALL);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn uninstall_surfaces_daemon_error() {
        let path = socket_path();
        let mut reply = vec![2u8];
        write_string(&mut reply, "launchctl failed").unwrap();
        let server = serve_once(&path, reply);

        let err = CfdevdClient::new(&path).uninstall().unwrap_err();
        assert_eq!(
            err.to_string(),
            "cfdevd-test refused uninstall (2): launchctl failed"
        );
        server.join().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_socket_means_not_installed() {
        let out = CfdevdClient::new(socket_path()).uninstall().unwrap();
        assert_eq!(out, "cfdevd not installed");
    }
}

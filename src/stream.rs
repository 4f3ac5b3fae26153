//! The byte-stream transport a session drives: TCP or a local Unix socket.

use std::io::{Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::error::{Error, Result};
use crate::opts::Opts;

/// A connected stream to the server.
pub enum NetStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl NetStream {
    /// Dial the endpoint described by `opts`. A configured host selects TCP;
    /// otherwise the Unix socket path is used.
    pub fn dial(opts: &Opts) -> Result<Self> {
        if let Some(host) = &opts.host {
            let addr = format!("{}:{}", host, opts.port);
            let stream = TcpStream::connect(&addr)
                .map_err(|e| Error::ConnHostError(format!("{addr}: {e}")))?;
            if opts.tcp_nodelay {
                stream
                    .set_nodelay(true)
                    .map_err(|e| Error::ConnHostError(format!("{addr}: {e}")))?;
            }
            return Ok(NetStream::Tcp(stream));
        }

        #[cfg(unix)]
        if let Some(path) = &opts.socket {
            let stream = UnixStream::connect(path)
                .map_err(|e| Error::ConnectionError(format!("{path}: {e}")))?;
            return Ok(NetStream::Unix(stream));
        }

        Err(Error::ConnHostError(opts.endpoint()))
    }

    /// Force the stream down; any in-flight read or write fails afterwards.
    pub fn shutdown(&self) {
        match self {
            NetStream::Tcp(stream) => {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
            #[cfg(unix)]
            NetStream::Unix(stream) => {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
        }
    }
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            NetStream::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            NetStream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            NetStream::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            NetStream::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            NetStream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            NetStream::Unix(stream) => stream.flush(),
        }
    }
}

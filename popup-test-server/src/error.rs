use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("port already in use: {addr}")]
    PortInUse {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("served root {} is not a usable directory", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("server error")]
    Serve(#[from] io::Error),
}

impl ServerError {
    /// Classify a listener bind failure.
    pub fn from_bind(addr: SocketAddr, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AddrInUse {
            ServerError::PortInUse { addr, source }
        } else {
            ServerError::Bind { addr, source }
        }
    }
}

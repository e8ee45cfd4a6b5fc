//! TCP listener glue: accept connections and hand each one to its own task.

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, info};

use crate::connection::handle_connection;
use crate::store::Store;

/// A bound server holding the listening socket and the shared store.
pub struct Server {
    listener: TcpListener,
    store: Store,
}

impl Server {
    /// Binds the listening socket and sets up an empty store.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;

        Ok(Server {
            listener,
            store: Store::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, spawning a task per client. Returns only
    /// when accepting fails.
    pub async fn run(self) -> io::Result<()> {
        info!("listening on {}", self.listener.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!("accepted connection from {}", peer);

            let store = self.store.clone();
            tokio::spawn(async move {
                handle_connection(stream, store).await;
            });
        }
    }
}

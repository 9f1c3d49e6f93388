//! Dispatcher, worker pool, and the per-connection protocol state machine
//! (§4.6, §4.7).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::connection::{grow_for_body, shrink_if_oversized, BufferPool};
use crate::index::IndexSlot;
use crate::query;

/// A handle to one worker's own single-threaded Tokio runtime.
///
/// Each worker owns an OS thread and a current-thread runtime (§5): once a
/// connection is routed to a worker, its task is spawned on that runtime
/// and never migrates.
pub struct Worker {
    sender: mpsc::UnboundedSender<TcpStream>,
    _thread: std::thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(id: usize, slot: Arc<IndexSlot>, reqs_per_event: u32, max_depth: usize) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<TcpStream>();
        let thread = std::thread::Builder::new()
            .name(format!("prefix-matchd-worker-{id}"))
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to build worker runtime");
                runtime.block_on(async move {
                    let pool = Arc::new(BufferPool::new());
                    while let Some(stream) = receiver.recv().await {
                        let slot = Arc::clone(&slot);
                        let pool = Arc::clone(&pool);
                        tokio::spawn(async move {
                            if let Err(error) = handle_connection(stream, &slot, &pool, reqs_per_event, max_depth).await {
                                tracing::debug!(%error, "connection closed");
                            }
                        });
                    }
                });
            })
            .expect("failed to spawn worker thread");
        Self { sender, _thread: thread }
    }
}

/// The fixed-size worker pool and round-robin dispatch counter (§4.6).
pub struct Dispatcher {
    workers: Vec<Worker>,
    next: AtomicUsize,
}

impl Dispatcher {
    /// Spawns `count` workers, each backed by its own OS thread and
    /// single-threaded runtime.
    #[must_use]
    pub fn spawn(count: usize, slot: Arc<IndexSlot>, reqs_per_event: u32, max_depth: usize) -> Self {
        let workers = (0..count.max(1)).map(|id| Worker::spawn(id, Arc::clone(&slot), reqs_per_event, max_depth)).collect();
        Self {
            workers,
            next: AtomicUsize::new(0),
        }
    }

    /// Dispatches an accepted stream to the next worker, round-robin.
    pub fn dispatch(&self, stream: TcpStream) {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        if self.workers[index].sender.send(stream).is_err() {
            tracing::error!(worker = index, "worker channel closed, dropping connection");
        }
    }
}

/// Binds a TCP listener on `port` with `backlog` as its listen queue depth
/// and `SO_REUSEADDR` set, rather than leaving both at whatever
/// `tokio::net::TcpListener::bind` defaults to.
///
/// # Errors
///
/// Returns any [`std::io::Error`] from the underlying socket calls.
pub fn bind_tcp_listener(port: u16, backlog: i32) -> std::io::Result<TcpListener> {
    use socket2::{Domain, Socket, Type};

    let address: std::net::SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}

/// How long to back off after an EMFILE before retrying `accept` (§4.6).
const EMFILE_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

#[cfg(unix)]
fn is_emfile(error: &std::io::Error) -> bool {
    error.raw_os_error() == Some(libc::EMFILE)
}

#[cfg(not(unix))]
fn is_emfile(_error: &std::io::Error) -> bool {
    false
}

/// Accepts connections from `listener` and dispatches them to `dispatcher`
/// forever (§4.6 "Dispatch").
pub async fn accept_loop(listener: TcpListener, dispatcher: Arc<Dispatcher>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "accepted connection");
                if let Err(error) = stream.set_nodelay(true) {
                    tracing::warn!(%error, "failed to set TCP_NODELAY");
                }
                dispatcher.dispatch(stream);
            }
            Err(error) if is_emfile(&error) => {
                // Out of file descriptors: retrying immediately would just
                // spin on the same error, so wait for one to free up.
                tracing::warn!(%error, "accept failed with EMFILE, backing off");
                tokio::time::sleep(EMFILE_BACKOFF).await;
            }
            Err(error) => {
                tracing::warn!(%error, "accept failed");
            }
        }
    }
}

/// Drives one connection's protocol state machine (§4.7) until it closes.
///
/// Request and response framing is delegated to the `protocol` crate; this
/// function is the `new_cmd → waiting → read → parse_cmd → nread → mwrite`
/// cycle. `reqs_per_event` is the fairness budget: every that many
/// completed commands, the task yields to the runtime rather than
/// immediately looping (§4.7 "Fairness").
pub(crate) async fn handle_connection<S>(mut stream: S, slot: &IndexSlot, pool: &BufferPool, reqs_per_event: u32, max_depth: usize) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut processed = 0u32;
    let mut buf = pool.checkout();

    let result = loop {
        // new_cmd entry (§4.5, §8 scenario 6): a buffer that grew past the
        // high watermark to serve one oversized body is replaced here,
        // rather than carried forward for the rest of the connection.
        shrink_if_oversized(&mut buf);

        let header = match protocol::read_request_header(&mut stream).await {
            Ok(header) => header,
            Err(protocol::ProtocolError::Io(error)) if error.kind() == std::io::ErrorKind::UnexpectedEof => break Ok(()),
            Err(error) => {
                tracing::debug!(%error, "closing connection on protocol error");
                break Ok(());
            }
        };

        let required = header.bodylen as usize;
        while !grow_for_body(&mut buf, required) {
            tokio::task::yield_now().await;
        }
        buf.resize(required, 0);
        if let Err(error) = stream.read_exact(&mut buf).await {
            break Err(error);
        }

        let response = match protocol::GetRequest::decode(&buf) {
            Ok(request) => {
                let epoch = slot.current().await;
                let names = query::query(&epoch, &request.query, request.max_number, max_depth);
                protocol::QueryResponse { names }
            }
            Err(error) => {
                tracing::debug!(%error, "malformed GET body");
                protocol::QueryResponse::default()
            }
        };
        if let Err(error) = response.write(&mut stream).await {
            break Err(error);
        }
        if let Err(error) = stream.flush().await {
            break Err(error);
        }

        processed += 1;
        if reqs_per_event > 0 && processed % reqs_per_event == 0 {
            tokio::task::yield_now().await;
        }
    };

    pool.release(buf);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::item::{NodeItem, StringArray};

    fn build_slot(dir: &tempfile::TempDir) -> IndexSlot {
        let dict_path = dir.path().join("dict.txt");
        std::fs::write(&dict_path, "").unwrap();
        let mut builder = trie::Builder::new();
        let mut array = StringArray::new();
        array.push(NodeItem::new("beij", 0.5));
        builder.push("beij".to_owned(), array).unwrap();
        let index_path = dir.path().join("index.bin");
        std::fs::write(&index_path, builder.build().unwrap()).unwrap();
        IndexSlot::load(&dict_path, &index_path).unwrap()
    }

    #[tokio::test]
    async fn bind_tcp_listener_binds_an_ephemeral_port() {
        let listener = bind_tcp_listener(0, 16).unwrap();
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn handles_one_request_over_a_duplex_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let slot = build_slot(&dir);

        let (mut client, server) = tokio::io::duplex(4096);
        let handle = tokio::spawn(async move {
            let pool = BufferPool::new();
            handle_connection(server, &slot, &pool, 20, 1024).await.ok();
        });

        let request = protocol::GetRequest {
            max_number: 5,
            query: "beij".to_owned(),
        };
        let body = request.encode();
        let mut frame = vec![protocol::REQUEST_MAGIC, 0x00, 0, 0, 0, 0, 0, 0];
        frame[2..6].copy_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);
        client.write_all(&frame).await.unwrap();

        let mut header = [0u8; 8];
        client.read_exact(&mut header).await.unwrap();
        assert_eq!(header[0], protocol::RESPONSE_MAGIC);
        let bodylen = u32::from_be_bytes([header[3], header[4], header[5], header[6]]) as usize;
        let mut body = vec![0u8; bodylen];
        client.read_exact(&mut body).await.unwrap();
        let response = protocol::QueryResponse::decode(&body).unwrap();
        assert_eq!(response.names, vec!["beij".to_owned()]);

        drop(client);
        handle.await.unwrap();
    }
}

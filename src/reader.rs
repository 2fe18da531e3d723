//! ResponseReader: concurrent per-connection fixed-size frame reader
//! (spec.md §4.3).

use crate::errors::OutcomeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::error;

/// One attempted read that produced data or a non-EOF error (spec.md §3
/// `ResponseOutcome`). EOF is terminal and silent — it never produces an
/// outcome.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub error: Option<OutcomeError>,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub payload_length_bytes: usize,
}

/// Starts and stops one reader task per dialed connection. `close()` is
/// a separate signal from the worker group's stop tokens — readers
/// react to it independently (spec.md §5).
pub struct ResponseReader {
    response_size_bytes: usize,
    read_deadline: Duration,
    // Held behind `Option` so `join()` can drop the last clone once every
    // reader task has exited, closing the response channel per spec.md
    // §4.7 step 4 ("closing is done after [stop] so no producer writes
    // to a closed channel").
    response_tx: Mutex<Option<mpsc::Sender<ResponseOutcome>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    total_read: AtomicU64,
    total_successful: AtomicU64,
    handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl ResponseReader {
    pub fn new(
        response_size_bytes: usize,
        read_deadline: Duration,
        response_tx: mpsc::Sender<ResponseOutcome>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            response_size_bytes,
            read_deadline,
            response_tx: Mutex::new(Some(response_tx)),
            stop_tx,
            stop_rx,
            total_read: AtomicU64::new(0),
            total_successful: AtomicU64::new(0),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns one reader task for `connection`. A no-op once `close()`
    /// has been called. `connection_id` identifies the connection for
    /// logging only; it does not appear on `ResponseOutcome` (spec.md
    /// §3).
    pub fn start_reading(self: &Arc<Self>, connection: OwnedReadHalf, connection_id: u64) {
        if *self.stop_tx.borrow() {
            return;
        }
        let Some(response_tx) = self.response_tx.try_lock().ok().and_then(|guard| guard.clone())
        else {
            return;
        };

        let reader = Arc::clone(self);
        let handle = tokio::spawn(async move {
            reader.read_loop(connection, connection_id, response_tx).await;
        });

        if let Ok(mut handles) = self.handles.try_lock() {
            handles.push(handle);
        }
    }

    async fn read_loop(
        &self,
        mut connection: OwnedReadHalf,
        connection_id: u64,
        response_tx: mpsc::Sender<ResponseOutcome>,
    ) {
        let _ = connection_id;
        let mut stop_rx = self.stop_rx.clone();
        let mut buffer = vec![0u8; self.response_size_bytes];

        loop {
            if *stop_rx.borrow() {
                break;
            }

            let read = async {
                if self.read_deadline.is_zero() {
                    connection.read(&mut buffer).await
                } else {
                    match tokio::time::timeout(self.read_deadline, connection.read(&mut buffer))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "read deadline exceeded",
                        )),
                    }
                }
            };

            tokio::select! {
                _ = stop_rx.changed() => break,
                result = read => match result {
                    Ok(0) => break, // EOF: terminal and silent.
                    Ok(_) => {
                        self.total_read.fetch_add(1, Ordering::Relaxed);
                        self.total_successful.fetch_add(1, Ordering::Relaxed);
                        let outcome = ResponseOutcome {
                            error: None,
                            received_at: chrono::Utc::now(),
                            // Reports the frame size, not bytes actually
                            // returned (spec.md §9 open question).
                            payload_length_bytes: self.response_size_bytes,
                        };
                        if response_tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        self.total_read.fetch_add(1, Ordering::Relaxed);
                        let outcome = ResponseOutcome {
                            error: Some(OutcomeError::from(err)),
                            received_at: chrono::Utc::now(),
                            payload_length_bytes: 0,
                        };
                        if response_tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                },
            }
        }

        drop(connection);
    }

    /// Signals every reader task to stop. Idempotent; further calls to
    /// `start_reading` become no-ops.
    pub fn close(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Waits for every spawned reader task to finish, logging panics at
    /// the task boundary (spec.md §7), then drops the response channel's
    /// last sender so the aggregator draining it observes end-of-stream.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(err) = handle.await {
                error!("reader task panicked: {err}");
            }
        }
        self.response_tx.lock().await.take();
    }

    pub fn total_responses_read(&self) -> u64 {
        self.total_read.load(Ordering::Relaxed)
    }

    pub fn total_successful_responses_read(&self) -> u64 {
        self.total_successful.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn echo_pair() -> (TcpStream, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 10];
            loop {
                match server.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if server.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        (client, handle)
    }

    #[tokio::test]
    async fn counts_full_frame_reads_as_success() {
        let (client, _echo) = echo_pair().await;
        let (mut read_half, mut write_half) = client.into_split();

        write_half.write_all(b"HelloWorld").await.unwrap();
        let mut buf = [0u8; 10];
        // Drain the echoed bytes back through a plain read so the
        // reader under test sees a clean second frame.
        read_half.read_exact(&mut buf).await.unwrap();
        write_half.write_all(b"HelloWorld").await.unwrap();

        let (response_tx, mut response_rx) = mpsc::channel(8);
        let reader = Arc::new(ResponseReader::new(10, Duration::ZERO, response_tx));
        reader.start_reading(read_half, 0);

        let outcome = response_rx.recv().await.unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.payload_length_bytes, 10);
        assert_eq!(reader.total_responses_read(), 1);
        assert_eq!(reader.total_successful_responses_read(), 1);

        reader.close();
        reader.join().await;
    }

    #[tokio::test]
    async fn eof_is_silent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        drop(server); // immediate EOF for the client side

        let (response_tx, mut response_rx) = mpsc::channel(8);
        let reader = Arc::new(ResponseReader::new(5, Duration::ZERO, response_tx));
        let (read_half, _write_half) = client.into_split();
        reader.start_reading(read_half, 0);
        reader.join().await;

        assert!(response_rx.recv().await.is_none() || response_rx.try_recv().is_err());
        assert_eq!(reader.total_responses_read(), 0);
    }
}

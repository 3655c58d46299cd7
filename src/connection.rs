use crate::errors::FrameError;
use crate::frames::payloads::{CallResponse, FramePayload};
use crate::frames::{Frame, FrameCodec, FrameId, FrameResult, Type, FRAME_HEADER_LENGTH, FRAME_MAX_LENGTH};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::codec::{FramedRead, FramedWrite};

/// Writes frames queued by any number of tasks to one socket.
pub(crate) struct FrameSender {
    framed_write: FramedWrite<OwnedWriteHalf, FrameCodec>,
    buffer_size: usize,
}

impl FrameSender {
    pub fn spawn(
        framed_write: FramedWrite<OwnedWriteHalf, FrameCodec>,
        frame_receiver: Receiver<FrameId>,
        buffer_size: usize,
    ) -> JoinHandle<()> {
        let frame_sender = FrameSender {
            framed_write,
            buffer_size,
        };
        tokio::spawn(async move {
            frame_sender.run(ReceiverStream::new(frame_receiver)).await;
            debug!("FrameSender stopped");
        })
    }

    async fn run(mut self, receiver_stream: ReceiverStream<FrameId>) {
        debug!("Starting FrameSender");
        let mut chunks = receiver_stream.ready_chunks(self.buffer_size);
        while let Some(frames) = chunks.next().await {
            if let Err(err) = self.send_frames(frames).await {
                error!("Failed to write frames: {}", err);
                break;
            }
        }
    }

    /// Fails only when the socket fails. A frame the codec refuses is dropped on its own.
    async fn send_frames(&mut self, frames: Vec<FrameId>) -> FrameResult<()> {
        for frame in frames {
            let id = frame.id();
            trace!("Writing frame (id: {})", id);
            match self.framed_write.feed(frame).await {
                Ok(()) => {}
                Err(FrameError::IoError(err)) => return Err(err.into()),
                Err(err) => error!("Skipping frame (id: {}): {}", id, err),
            }
        }
        self.framed_write.flush().await
    }
}

/// Calls waiting for a response, keyed by frame id.
#[derive(Debug, Default)]
pub(crate) struct PendingCalls {
    state: Mutex<PendingState>,
}

#[derive(Debug, Default)]
struct PendingState {
    senders: HashMap<u32, oneshot::Sender<CallResponse>>,
    closed: bool,
}

impl PendingCalls {
    fn state(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: u32) -> FrameResult<oneshot::Receiver<CallResponse>> {
        let mut state = self.state();
        if state.closed {
            return Err(FrameError::Error("Connection closed".to_string()));
        }
        if state.senders.contains_key(&id) {
            return Err(FrameError::Error(format!("Duplicated id: {}", id)));
        }
        let (sender, receiver) = oneshot::channel();
        state.senders.insert(id, sender);
        Ok(receiver)
    }

    pub fn deregister(&self, id: u32) {
        self.state().senders.remove(&id);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state().senders.len()
    }

    /// Hands a response frame to the call waiting for it.
    pub fn complete(&self, frame: FrameId) -> FrameResult<()> {
        let id = frame.id();
        let frame = frame.into_frame();
        if frame.frame_type() != Type::CallResponse {
            return Err(FrameError::Error(format!(
                "Unexpected frame type {:?} (id: {})",
                frame.frame_type(),
                id
            )));
        }
        let response = CallResponse::decode(&mut frame.into_payload())?;
        let sender = self.state().senders.remove(&id);
        match sender {
            Some(sender) => sender
                .send(response)
                .map_err(|_| FrameError::Error(format!("Call {} no longer waits", id))),
            None => Err(FrameError::Error(format!("Id {} not found", id))),
        }
    }

    /// Drops every waiting call and refuses new ones; receivers observe a closed channel.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.senders.clear();
    }
}

/// Removes the call from [`PendingCalls`] when its caller stops waiting.
struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.deregister(self.id);
    }
}

/// Client side of one TCP connection with any number of calls in flight.
#[derive(Debug)]
pub(crate) struct Connection {
    next_message_id: AtomicU32,
    pending: Arc<PendingCalls>,
    sender: Sender<FrameId>,
    peer: SocketAddr,
    receiver_task: JoinHandle<()>,
}

impl Connection {
    pub async fn connect(stream: TcpStream, buffer_size: usize) -> FrameResult<Connection> {
        let peer = stream.peer_addr()?;
        let (read, write) = stream.into_split();
        let (sender, receiver) = mpsc::channel::<FrameId>(buffer_size);
        let pending = Arc::new(PendingCalls::default());
        FrameSender::spawn(FramedWrite::new(write, FrameCodec::default()), receiver, buffer_size);
        let receiver_task = tokio::spawn(receive_frames(
            FramedRead::new(read, FrameCodec::default()),
            pending.clone(),
        ));
        Ok(Connection {
            next_message_id: AtomicU32::new(1),
            pending,
            sender,
            peer,
            receiver_task,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends `frame` under a fresh id and waits for the matching response.
    ///
    /// Fails at once when the frame exceeds [`FRAME_MAX_LENGTH`] or the connection is closed.
    pub async fn send_one(&self, frame: Frame) -> FrameResult<CallResponse> {
        let size = frame.size() + FRAME_HEADER_LENGTH;
        if size > FRAME_MAX_LENGTH {
            return Err(FrameError::TooLarge {
                size,
                max: FRAME_MAX_LENGTH,
            });
        }
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let response = self.pending.register(id)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };
        if self.sender.send(FrameId::new(id, frame)).await.is_err() {
            return Err(FrameError::Error("Connection closed".to_string()));
        }
        response
            .await
            .map_err(|_| FrameError::Error("Connection closed before response".to_string()))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.receiver_task.abort();
    }
}

async fn receive_frames(mut framed_read: FramedRead<OwnedReadHalf, FrameCodec>, pending: Arc<PendingCalls>) {
    debug!("Starting frame receiver");
    while let Some(frame) = framed_read.next().await {
        match frame {
            Ok(frame) => {
                if let Err(err) = pending.complete(frame) {
                    warn!("Dropping response: {}", err);
                }
            }
            Err(err) => {
                error!("Frame handling failure: {}", err);
                break;
            }
        }
    }
    pending.close();
    debug!("Frame receiver stopped");
}

use crate::{
    chunks::Chunks,
    connection::{self, Config, StreamCommand},
    flow_control::FlowController,
    frame::{
        header::{flags, Header},
        Frame,
    },
};
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use futures::lock::{Mutex, MutexGuard};
use futures::prelude::*;
use libp2prs_core::error::CoreError;
use libp2prs_core::muxing::{MuxedStream, StreamInfo};
use libp2prs_traits::{ReadEx, WriteEx};
use std::{fmt, io, sync::Arc};

/// The state of a Yamux stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Open bidirectionally.
    Open,
    /// Open for incoming messages only; we closed our write half.
    SendClosed,
    /// Open for outgoing messages only; the peer closed its write half.
    RecvClosed,
    /// Closed (terminal state).
    Closed,
}

impl State {
    pub fn can_read(self) -> bool {
        !matches!(self, State::RecvClosed | State::Closed)
    }

    pub fn can_write(self) -> bool {
        !matches!(self, State::SendClosed | State::Closed)
    }
}

/// Indicates a flag still needs to be set on the next outbound header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Flag {
    None,
    Syn,
    Ack,
}

/// A single multiplexed Yamux stream.
///
/// Created either outbound via [`super::Control::open_stream`] or inbound
/// via the connection's accept path. Implements [`ReadEx`]/[`WriteEx`] so it
/// can be handed to anything generic over those traits, plus the
/// half-close/reset operations [`MuxedStream`] adds.
pub struct Stream {
    id: u32,
    conn: connection::Id,
    config: Arc<Config>,
    sender: mpsc::Sender<StreamCommand>,
    flag: Flag,
    protocol_id: Option<String>,
    shared: Arc<Mutex<Shared>>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).field("connection", &self.conn).finish()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(Stream {}/{})", self.conn, self.id)
    }
}

impl Stream {
    pub(crate) fn new(
        id: u32,
        conn: connection::Id,
        config: Arc<Config>,
        window: u32,
        credit: u32,
        sender: mpsc::Sender<StreamCommand>,
    ) -> Self {
        let auto_tune = config.enable_window_auto_tuning;
        let max_auto_tune = config.max_auto_tune_window;
        Stream {
            id,
            conn,
            config,
            sender,
            flag: Flag::None,
            protocol_id: None,
            shared: Arc::new(Mutex::new(Shared::new(window, credit, auto_tune, max_auto_tune))),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn set_flag(&mut self, flag: Flag) {
        self.flag = flag
    }

    pub(crate) async fn state(&self) -> State {
        self.shared().await.state
    }

    pub(crate) async fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().await
    }

    pub(crate) fn handle(&self) -> Arc<Mutex<Shared>> {
        self.shared.clone()
    }

    fn write_zero_err(&self) -> io::Error {
        io::Error::new(io::ErrorKind::WriteZero, format!("{}/{}: connection is closed", self.conn, self.id))
    }

    fn add_flag(&mut self, header: &mut Header) {
        match self.flag {
            Flag::None => (),
            Flag::Syn => {
                header.syn();
                self.flag = Flag::None
            }
            Flag::Ack => {
                header.ack();
                self.flag = Flag::None
            }
        }
    }
}

impl Clone for Stream {
    fn clone(&self) -> Self {
        Stream {
            id: self.id,
            conn: self.conn,
            config: self.config.clone(),
            sender: self.sender.clone(),
            flag: self.flag,
            protocol_id: self.protocol_id.clone(),
            shared: self.shared.clone(),
        }
    }
}

#[async_trait]
impl ReadEx for Stream {
    async fn read2(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.config.read_after_close && self.sender.is_closed() {
            return Ok(0);
        }

        // Buffered bytes are always delivered, even past close, so a slow
        // reader never loses what's already arrived. Waiting for more
        // registers a one-shot wake-up and releases the lock before
        // suspending - the connection's read loop takes the same lock to
        // push data and must never block on us.
        loop {
            let notify = {
                let mut shared = self.shared().await;

                if shared.buffer.len().unwrap_or(0) > 0 {
                    let mut n = 0;
                    while let Some(chunk) = shared.buffer.front_mut() {
                        if chunk.is_empty() {
                            shared.buffer.pop();
                            continue;
                        }
                        let k = std::cmp::min(chunk.len(), buf.len() - n);
                        buf[n..n + k].copy_from_slice(&chunk.as_ref()[..k]);
                        n += k;
                        chunk.advance(k);
                        if n == buf.len() {
                            break;
                        }
                    }

                    if self.config.window_update_mode == super::WindowUpdateMode::OnRead {
                        let blen = shared.buffer.len().unwrap_or(0) as u32;
                        if let Some(delta) = shared.flow.data_consumed(n as u32, blen) {
                            drop(shared);
                            let mut frame = Frame::window_update(self.id, delta);
                            self.add_flag(&mut frame.header);
                            let _ = self.sender.send(StreamCommand::SendFrame(frame)).await;
                        }
                    }

                    return Ok(n);
                }

                if !shared.state.can_read() {
                    log::debug!("{}/{}: eof", self.conn, self.id);
                    return Err(io::ErrorKind::BrokenPipe.into());
                }

                let (tx, rx) = oneshot::channel();
                shared.reader = Some(tx);
                rx
            };
            let _ = notify.await;
        }
    }
}

#[async_trait]
impl WriteEx for Stream {
    async fn write2(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A single chunk, bounded by whatever credit is available right
        // now; the caller loops to send the rest. Waiting for credit
        // releases the lock before suspending, same as `read2`, and times
        // out after 30s per the write-window-wait contract.
        let body = loop {
            let notify = {
                let mut shared = self.shared().await;
                if !shared.state.can_write() {
                    return Err(self.write_zero_err());
                }

                if shared.credit > 0 {
                    let k = std::cmp::min(shared.credit as usize, buf.len());
                    shared.credit = shared.credit.saturating_sub(k as u32);
                    break Vec::from(&buf[..k]);
                }

                let (tx, rx) = oneshot::channel();
                shared.writer = Some(tx);
                rx
            };

            let timeout = futures_timer::Delay::new(std::time::Duration::from_secs(30));
            match future::select(notify, timeout).await {
                future::Either::Left(_) => {}
                future::Either::Right(_) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, format!("{}/{}: write window timeout", self.conn, self.id)));
                }
            }
        };

        let n = body.len();
        let mut frame = Frame::data(self.id, body).expect("body bounded by MAX_MSG_SIZE");
        self.add_flag(&mut frame.header);
        self.sender.send(StreamCommand::SendFrame(frame)).await.map_err(|_| self.write_zero_err())?;
        Ok(n)
    }

    async fn flush2(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close2(&mut self) -> io::Result<()> {
        self.close_write_inner().await
    }
}

impl Stream {
    async fn close_write_inner(&mut self) -> io::Result<()> {
        if self.state().await == State::Closed || self.state().await == State::SendClosed {
            return Ok(());
        }

        let ack = if self.flag == Flag::Ack {
            self.flag = Flag::None;
            true
        } else {
            false
        };

        self.sender.send(StreamCommand::CloseStream { id: self.id, ack }).await.map_err(|_| self.write_zero_err())?;

        let mut shared = self.shared().await;
        shared.update_state(self.conn, self.id, State::SendClosed);
        Ok(())
    }
}

#[async_trait]
impl MuxedStream for Stream {
    async fn close_write(&mut self) -> Result<(), CoreError> {
        self.close_write_inner().await.map_err(CoreError::Io)
    }

    /// Local-only: Yamux has no `STOP_SENDING` wire signal. Idempotent;
    /// clears whatever is already buffered and wakes pending readers with
    /// `streamClosed` rather than delivering them stale data.
    async fn close_read(&mut self) -> Result<(), CoreError> {
        let mut shared = self.shared().await;
        if !shared.state.can_read() {
            return Ok(());
        }
        shared.buffer.clear();
        if let Some(w) = shared.reader.take() {
            let _ = w.send(());
        }
        shared.update_state(self.conn, self.id, State::RecvClosed);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.close_write_inner().await.map_err(CoreError::Io)?;
        let mut shared = self.shared().await;
        shared.buffer.clear();
        if let Some(w) = shared.reader.take() {
            let _ = w.send(());
        }
        shared.update_state(self.conn, self.id, State::RecvClosed);
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), CoreError> {
        {
            let mut shared = self.shared().await;
            shared.state = State::Closed;
            if let Some(w) = shared.reader.take() {
                let _ = w.send(());
            }
            if let Some(w) = shared.writer.take() {
                let _ = w.send(());
            }
        }
        let mut frame = Frame::data(self.id, Vec::new()).expect("empty body always fits");
        frame.header.rst();
        self.sender.send(StreamCommand::SendFrame(frame)).await.map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::Other, e)))
    }
}

impl StreamInfo for Stream {
    fn protocol_id(&self) -> Option<&str> {
        self.protocol_id.as_deref()
    }

    fn set_protocol_id(&mut self, proto: String) {
        self.protocol_id = Some(proto);
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        log::trace!("drop stream {}/{}", self.conn, self.id);
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: State,
    pub(crate) credit: u32,
    pub(crate) flow: FlowController,
    pub(crate) buffer: Chunks,
    pub(crate) reader: Option<oneshot::Sender<()>>,
    pub(crate) writer: Option<oneshot::Sender<()>>,
}

impl Shared {
    fn new(window: u32, credit: u32, auto_tune: bool, max_auto_tune: u32) -> Self {
        Shared {
            state: State::Open,
            credit,
            flow: FlowController::new(window, auto_tune, max_auto_tune),
            buffer: Chunks::new(),
            reader: None,
            writer: None,
        }
    }

    /// Updates the stream state, returning the previous one.
    pub(crate) fn update_state(&mut self, cid: connection::Id, sid: u32, next: State) -> State {
        use State::*;
        let current = self.state;
        self.state = match (current, next) {
            (Closed, _) => Closed,
            (Open, _) => next,
            (RecvClosed, Open) | (RecvClosed, RecvClosed) => RecvClosed,
            (RecvClosed, Closed) | (RecvClosed, SendClosed) => Closed,
            (SendClosed, Open) | (SendClosed, SendClosed) => SendClosed,
            (SendClosed, Closed) | (SendClosed, RecvClosed) => Closed,
        };
        log::trace!("{}/{}: {:?} -> {:?}", cid, sid, current, self.state);
        current
    }
}

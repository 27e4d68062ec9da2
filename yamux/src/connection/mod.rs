//! The Yamux connection: a single read-loop task owning the stream table,
//! the underlying byte pipe and the outbound-write path.

pub mod control;
pub mod stream;

use crate::frame::{
    header::{flags, Tag, HEADER_LENGTH},
    Frame, FrameCodec,
};
use control::Control;
use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, StreamExt};
use futures_timer::Delay;
use libp2prs_core::error::{CoreError, LifecycleError};
use libp2prs_traits::{ReadEx, WriteEx};
use nohash_hasher::IntMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stream::{Flag, State, Stream};

/// Reach-ability role: determines the parity of stream IDs this side opens.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Client,
    Server,
}

/// Specifies when window update frames are sent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WindowUpdateMode {
    /// Send window updates as soon as a stream's window drops to zero.
    OnReceive,
    /// Send window updates only when the application reads data.
    OnRead,
}

/// Yamux connection configuration. See the field docs for defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_concurrent_streams: usize,
    pub max_pending_inbound_streams: usize,
    pub initial_window_size: u32,
    pub enable_keep_alive: bool,
    pub keep_alive_interval: Duration,
    pub keep_alive_timeout: Duration,
    pub enable_window_auto_tuning: bool,
    pub max_auto_tune_window: u32,
    pub window_update_mode: WindowUpdateMode,
    pub read_after_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_concurrent_streams: 1000,
            max_pending_inbound_streams: 100,
            initial_window_size: 256 * 1024,
            enable_keep_alive: true,
            keep_alive_interval: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(60),
            enable_window_auto_tuning: true,
            max_auto_tune_window: 16 * 1024 * 1024,
            // OnRead is the only window-update timing spec §4.B models
            // (credit is tied to the consumer draining the reassembly
            // buffer, not to the receiver merely holding the bytes); OnReceive
            // stays selectable via `set_window_update_mode` for callers that
            // want credit replenished as soon as data arrives instead.
            window_update_mode: WindowUpdateMode::OnRead,
            read_after_close: true,
        }
    }
}

impl Config {
    /// Set the maximum number of concurrently open streams.
    pub fn set_max_concurrent_streams(&mut self, n: usize) -> &mut Self {
        self.max_concurrent_streams = n;
        self
    }

    /// Set the maximum number of inbound streams awaiting `accept_stream`.
    pub fn set_max_pending_inbound_streams(&mut self, n: usize) -> &mut Self {
        self.max_pending_inbound_streams = n;
        self
    }

    /// Set the initial per-stream receive window.
    pub fn set_initial_window_size(&mut self, n: u32) -> &mut Self {
        self.initial_window_size = n;
        self
    }

    /// Enable or disable keep-alive pings.
    pub fn set_enable_keep_alive(&mut self, b: bool) -> &mut Self {
        self.enable_keep_alive = b;
        self
    }

    /// Set the interval between keep-alive pings.
    pub fn set_keep_alive_interval(&mut self, d: Duration) -> &mut Self {
        self.keep_alive_interval = d;
        self
    }

    /// Set how long an unanswered keep-alive ping is tolerated before the
    /// connection is torn down.
    pub fn set_keep_alive_timeout(&mut self, d: Duration) -> &mut Self {
        self.keep_alive_timeout = d;
        self
    }

    /// Enable or disable per-stream receive window auto-tuning.
    pub fn set_enable_window_auto_tuning(&mut self, b: bool) -> &mut Self {
        self.enable_window_auto_tuning = b;
        self
    }

    /// Set the ceiling auto-tuning may grow a stream's receive window to.
    pub fn set_max_auto_tune_window(&mut self, n: u32) -> &mut Self {
        self.max_auto_tune_window = n;
        self
    }

    /// Set the window update mode to use.
    pub fn set_window_update_mode(&mut self, m: WindowUpdateMode) -> &mut Self {
        self.window_update_mode = m;
        self
    }

    /// Allow or disallow streams to read buffered data after the
    /// connection has been closed.
    pub fn set_read_after_close(&mut self, b: bool) -> &mut Self {
        self.read_after_close = b;
        self
    }
}

const MAX_SEND_WINDOW: u32 = 16 * 1024 * 1024;
const MAX_READ_BUFFER: usize = 32 * 1024 * 1024;

/// A connection identifier, used only for logging.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    pub fn random() -> Self {
        Id(rand::random())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Sent by a [`Stream`] to the connection's driver task.
pub(crate) enum StreamCommand {
    SendFrame(Frame),
    CloseStream { id: u32, ack: bool },
}

/// Sent by a [`Control`] handle to the connection's driver task.
pub(crate) enum ControlCommand {
    OpenStream(oneshot::Sender<Result<Stream, CoreError>>),
    AcceptStream(oneshot::Sender<Result<Stream, CoreError>>),
    Close(oneshot::Sender<()>),
}

struct PendingPing {
    sent_at: Instant,
}

/// Owns the yamux session: the stream table, the underlying pipe, and the
/// single-writer actor. [`Connection::new`] returns both the connection and
/// its paired [`Control`] handle; drive the connection to completion with
/// [`Connection::run`], typically spawned as a background task.
pub struct Connection<R, W> {
    id: Id,
    mode: Mode,
    config: Arc<Config>,
    reader: R,
    writer: W,

    streams: IntMap<u32, Stream>,
    next_id: u32,

    pending_accept: VecDeque<Stream>,
    accept_waiters: VecDeque<oneshot::Sender<Result<Stream, CoreError>>>,

    control_rx: mpsc::Receiver<ControlCommand>,
    stream_cmd_tx: mpsc::Sender<StreamCommand>,
    stream_cmd_rx: mpsc::Receiver<StreamCommand>,

    read_buf: Vec<u8>,
    read_pos: usize,

    pending_pings: IntMap<u32, PendingPing>,
    next_ping_nonce: u32,

    is_closed: bool,
    go_away_received: bool,
}

impl<R, W> Connection<R, W>
where
    R: ReadEx + Unpin + Send + 'static,
    W: WriteEx + Unpin + Send + 'static,
{
    pub fn new(id: Id, reader: R, writer: W, mode: Mode, config: Config) -> (Self, Control) {
        let (control_tx, control_rx) = mpsc::channel(32);
        let (stream_cmd_tx, stream_cmd_rx) = mpsc::channel(256);

        let next_id = match mode {
            Mode::Client => 1,
            Mode::Server => 2,
        };

        let conn = Connection {
            id,
            mode,
            config: Arc::new(config),
            reader,
            writer,
            streams: IntMap::default(),
            next_id,
            pending_accept: VecDeque::new(),
            accept_waiters: VecDeque::new(),
            control_rx,
            stream_cmd_tx,
            stream_cmd_rx,
            read_buf: Vec::with_capacity(HEADER_LENGTH * 64),
            read_pos: 0,
            pending_pings: IntMap::default(),
            next_ping_nonce: 0,
            is_closed: false,
            go_away_received: false,
        };

        (conn, Control::new(control_tx))
    }

    /// Drives the connection until it is closed, locally or remotely.
    pub async fn run(mut self) {
        let mut keep_alive = if self.config.enable_keep_alive {
            Some(Delay::new(self.config.keep_alive_interval))
        } else {
            None
        };

        loop {
            if self.is_closed {
                break;
            }

            let mut read_chunk = [0u8; 8192];

            futures::select_biased! {
                cmd = self.control_rx.next() => {
                    match cmd {
                        Some(c) => self.handle_control(c).await,
                        None => { self.shutdown(true).await; break }
                    }
                }
                cmd = self.stream_cmd_rx.next() => {
                    match cmd {
                        Some(c) => { if self.handle_stream_command(c).await.is_err() { self.shutdown(true).await; break } }
                        None => {}
                    }
                }
                n = self.reader.read2(&mut read_chunk).fuse() => {
                    match n {
                        Ok(0) => { self.shutdown(true).await; break }
                        Ok(n) => {
                            self.read_buf.extend_from_slice(&read_chunk[..n]);
                            if self.read_buf.len() - self.read_pos > MAX_READ_BUFFER {
                                log::warn!("{}: reassembly buffer exceeded cap, closing", self.id);
                                self.shutdown(true).await;
                                break;
                            }
                            if self.drain_frames().await.is_err() {
                                self.shutdown(true).await;
                                break;
                            }
                            if self.go_away_received {
                                self.shutdown(true).await;
                                break;
                            }
                        }
                        Err(e) => {
                            log::debug!("{}: read error: {}", self.id, e);
                            self.shutdown(true).await;
                            break;
                        }
                    }
                }
                _ = Self::keep_alive_tick(&mut keep_alive).fuse() => {
                    if self.config.enable_keep_alive {
                        if self.check_keep_alive_timeout() {
                            log::debug!("{}: keep alive timeout", self.id);
                            self.shutdown(true).await;
                            break;
                        }
                        self.send_ping().await.ok();
                        keep_alive = Some(Delay::new(self.config.keep_alive_interval));
                    }
                }
            }
        }
    }

    async fn keep_alive_tick(delay: &mut Option<Delay>) {
        match delay {
            Some(d) => d.await,
            None => futures::future::pending().await,
        }
    }

    fn check_keep_alive_timeout(&self) -> bool {
        let timeout = self.config.keep_alive_timeout;
        self.pending_pings.values().any(|p| p.sent_at.elapsed() > timeout)
    }

    async fn send_ping(&mut self) -> Result<(), CoreError> {
        let nonce = self.next_ping_nonce;
        self.next_ping_nonce = self.next_ping_nonce.wrapping_add(1);
        self.pending_pings.insert(nonce, PendingPing { sent_at: Instant::now() });
        self.write_frame(&Frame::ping(nonce)).await
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<(), CoreError> {
        let bytes = FrameCodec::encode(frame);
        self.writer.write2(&bytes).await.map_err(CoreError::Io)?;
        self.writer.flush2().await.map_err(CoreError::Io)
    }

    async fn handle_control(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::OpenStream(reply) => {
                let result = self.open_stream().await;
                let _ = reply.send(result);
            }
            ControlCommand::AcceptStream(reply) => {
                if let Some(s) = self.pending_accept.pop_front() {
                    let _ = reply.send(Ok(s));
                } else {
                    self.accept_waiters.push_back(reply);
                }
            }
            ControlCommand::Close(reply) => {
                self.shutdown(false).await;
                let _ = reply.send(());
            }
        }
    }

    async fn open_stream(&mut self) -> Result<Stream, CoreError> {
        if self.is_closed || self.go_away_received {
            return Err(CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: false }));
        }
        if self.streams.len() >= self.config.max_concurrent_streams {
            return Err(CoreError::Connection(libp2prs_core::error::ConnectionFault::MaxStreamsExceeded(
                self.config.max_concurrent_streams,
            )));
        }

        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(2)
            .ok_or(CoreError::Connection(libp2prs_core::error::ConnectionFault::StreamIdExhausted))?;

        let mut stream = Stream::new(id, self.id, self.config.clone(), self.config.initial_window_size, self.config.initial_window_size, self.stream_cmd_tx.clone());
        stream.set_flag(Flag::Syn);
        self.streams.insert(id, stream.clone());

        let mut frame = Frame::data(id, Vec::new()).expect("empty body always fits");
        frame.header.syn();
        if let Err(e) = self.write_frame(&frame).await {
            self.streams.remove(&id);
            return Err(e);
        }

        Ok(stream)
    }

    async fn handle_stream_command(&mut self, cmd: StreamCommand) -> Result<(), CoreError> {
        match cmd {
            StreamCommand::SendFrame(frame) => self.write_frame(&frame).await,
            StreamCommand::CloseStream { id, ack } => {
                let mut frame = Frame::data(id, Vec::new()).expect("empty body always fits");
                frame.header.fin();
                if ack {
                    frame.header.ack();
                }
                self.write_frame(&frame).await
            }
        }
    }

    fn is_valid_remote_syn_id(&self, id: u32) -> bool {
        if id == 0 {
            return false;
        }
        let expect_even = matches!(self.mode, Mode::Client);
        let is_even = id % 2 == 0;
        is_even == expect_even
    }

    async fn drain_frames(&mut self) -> Result<(), CoreError> {
        loop {
            let frame = match FrameCodec::decode(&self.read_buf, &mut self.read_pos) {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(e) => return Err(e.into()),
            };
            self.dispatch(frame).await?;
        }
        // compact the buffer so it doesn't grow unbounded across many small reads
        if self.read_pos > 0 {
            self.read_buf.drain(..self.read_pos);
            self.read_pos = 0;
        }
        Ok(())
    }

    async fn dispatch(&mut self, frame: Frame) -> Result<(), CoreError> {
        match frame.header.tag {
            Tag::Data => self.dispatch_data(frame).await,
            Tag::WindowUpdate => {
                self.dispatch_window_update(frame).await;
                Ok(())
            }
            Tag::Ping => {
                self.dispatch_ping(frame).await;
                Ok(())
            }
            Tag::GoAway => {
                self.go_away_received = true;
                Ok(())
            }
        }
    }

    async fn dispatch_data(&mut self, frame: Frame) -> Result<(), CoreError> {
        let id = frame.header.stream_id;
        let rst = frame.header.has(flags::RST);
        let fin = frame.header.has(flags::FIN) && !rst;
        let syn = frame.header.has(flags::SYN);

        if self.streams.contains_key(&id) {
            // A SYN for a stream ID we already have open is a stream-ID-reuse
            // violation: reject the new attempt, leave the existing stream alone.
            if syn {
                self.send_rst(id).await.ok();
                return Ok(());
            }
        } else {
            if !syn {
                self.send_rst(id).await.ok();
                return Ok(());
            }
            if !self.is_valid_remote_syn_id(id) {
                self.send_rst(id).await.ok();
                return Ok(());
            }
            if self.go_away_received || self.streams.len() >= self.config.max_concurrent_streams {
                self.send_rst(id).await.ok();
                return Ok(());
            }

            let mut stream = Stream::new(id, self.id, self.config.clone(), self.config.initial_window_size, self.config.initial_window_size, self.stream_cmd_tx.clone());
            stream.set_flag(Flag::Ack);

            if let Some(waiter) = self.accept_waiters.pop_front() {
                self.streams.insert(id, stream.clone());
                let _ = waiter.send(Ok(stream));
            } else if self.pending_accept.len() < self.config.max_pending_inbound_streams {
                self.streams.insert(id, stream.clone());
                self.pending_accept.push_back(stream);
            } else {
                self.send_rst(id).await.ok();
                return Ok(());
            }
        }

        let data_len = frame.body.len() as u32;
        let stream = self.streams.get(&id).cloned();
        let (remove, window_violation, window_update) = if let Some(stream) = stream {
            let mut shared = stream.shared().await;

            if rst {
                shared.state = State::Closed;
                if let Some(w) = shared.reader.take() {
                    let _ = w.send(());
                }
                if let Some(w) = shared.writer.take() {
                    let _ = w.send(());
                }
                (true, false, None)
            } else if data_len > 0 && !shared.flow.data_received(data_len) {
                // §4.C: "the stream is forcibly reset and all waiters fail
                // with windowExceeded" - mirror the RST branch above so a
                // caller parked in read2/write2 is actually woken instead of
                // hanging on a oneshot nobody ever fires.
                shared.state = State::Closed;
                if let Some(w) = shared.reader.take() {
                    let _ = w.send(());
                }
                if let Some(w) = shared.writer.take() {
                    let _ = w.send(());
                }
                (true, true, None)
            } else {
                if data_len > 0 && shared.state.can_read() {
                    shared.buffer.push(frame.body);
                    if let Some(w) = shared.reader.take() {
                        let _ = w.send(());
                    }
                }
                if fin {
                    shared.update_state(self.id, id, State::RecvClosed);
                }

                // OnRead ties the windowUpdate to the application draining
                // the reassembly buffer (handled in `Stream::read2`).
                // OnReceive replenishes credit as soon as the bytes land
                // here instead, so the peer's send window is never starved
                // by the receiver simply holding unread data.
                let window_update = if data_len > 0 && self.config.window_update_mode == WindowUpdateMode::OnReceive {
                    let blen = shared.buffer.len().unwrap_or(0) as u32;
                    shared.flow.data_consumed(data_len, blen)
                } else {
                    None
                };

                (false, false, window_update)
            }
        } else {
            (false, false, None)
        };

        if remove {
            self.streams.remove(&id);
        }
        if window_violation {
            self.send_rst(id).await.ok();
        }
        if let Some(delta) = window_update {
            let frame = Frame::window_update(id, delta);
            self.write_frame(&frame).await.ok();
        }

        Ok(())
    }

    async fn send_rst(&mut self, id: u32) -> Result<(), CoreError> {
        let mut frame = Frame::data(id, Vec::new()).expect("empty body always fits");
        frame.header.rst();
        self.write_frame(&frame).await
    }

    async fn dispatch_window_update(&mut self, frame: Frame) {
        let id = frame.header.stream_id;
        if let Some(stream) = self.streams.get(&id) {
            let mut shared = stream.shared().await;
            shared.credit = shared.credit.saturating_add(frame.header.length).min(MAX_SEND_WINDOW);
            if let Some(w) = shared.writer.take() {
                let _ = w.send(());
            }
        }
    }

    async fn dispatch_ping(&mut self, frame: Frame) {
        if frame.header.has(flags::ACK) {
            self.pending_pings.remove(&frame.header.length);
        } else {
            let mut reply = Frame::ping(frame.header.length);
            reply.header.ack();
            self.write_frame(&reply).await.ok();
        }
    }

    async fn shutdown(&mut self, abrupt: bool) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;

        let streams: Vec<Stream> = self.streams.drain().map(|(_, s)| s).collect();
        for s in streams {
            let mut shared = s.shared().await;
            shared.state = State::Closed;
            if let Some(w) = shared.reader.take() {
                let _ = w.send(());
            }
            if let Some(w) = shared.writer.take() {
                let _ = w.send(());
            }
            drop(shared);
            if !abrupt {
                let mut frame = Frame::data(s.id(), Vec::new()).expect("empty body always fits");
                frame.header.fin();
                let _ = self.write_frame(&frame).await;
            }
        }

        for waiter in self.accept_waiters.drain(..) {
            let _ = waiter.send(Err(CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: abrupt })));
        }
        self.pending_accept.clear();

        if !abrupt {
            let _ = self.write_frame(&Frame::go_away(0)).await;
        }

        let _ = self.writer.close2().await;
    }

    pub fn id(&self) -> Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as chan;
    use libp2prs_core::muxing::MuxedStream;
    use std::collections::VecDeque as Queue;
    use std::io;

    // An in-memory byte pipe so the read-loop/flow-control/keep-alive paths
    // can be exercised without a real socket. Each direction is its own
    // unbounded `Vec<u8>` channel; `PipeReader` reassembles whatever was
    // pushed, one chunk at a time, matching how a real stream hands back
    // partial reads.
    struct PipeReader(chan::UnboundedReceiver<Vec<u8>>, Queue<u8>);
    struct PipeWriter(chan::UnboundedSender<Vec<u8>>);

    fn pipe_pair() -> ((PipeReader, PipeWriter), (PipeReader, PipeWriter)) {
        let (a_tx, a_rx) = chan::unbounded();
        let (b_tx, b_rx) = chan::unbounded();
        ((PipeReader(b_rx, Queue::new()), PipeWriter(a_tx)), (PipeReader(a_rx, Queue::new()), PipeWriter(b_tx)))
    }

    #[async_trait::async_trait]
    impl ReadEx for PipeReader {
        async fn read2(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            use futures::StreamExt;
            if self.1.is_empty() {
                match self.0.next().await {
                    Some(chunk) => self.1.extend(chunk),
                    None => return Ok(0),
                }
            }
            let n = std::cmp::min(buf.len(), self.1.len());
            for b in buf.iter_mut().take(n) {
                *b = self.1.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    #[async_trait::async_trait]
    impl WriteEx for PipeWriter {
        async fn write2(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.unbounded_send(buf.to_vec()).map_err(|_| io::ErrorKind::BrokenPipe)?;
            Ok(buf.len())
        }
        async fn flush2(&mut self) -> io::Result<()> {
            Ok(())
        }
        async fn close2(&mut self) -> io::Result<()> {
            self.0.close_channel();
            Ok(())
        }
    }

    fn spawn_pair(config: Config) -> (Control, Control) {
        let ((r1, w1), (r2, w2)) = pipe_pair();
        let (client, client_ctrl) = Connection::new(Id::random(), r1, w1, Mode::Client, config.clone());
        let (server, server_ctrl) = Connection::new(Id::random(), r2, w2, Mode::Server, config);
        async_std::task::spawn(client.run());
        async_std::task::spawn(server.run());
        (client_ctrl, server_ctrl)
    }

    #[test]
    fn stream_open_and_echo() {
        async_std::task::block_on(async {
            let (client_ctrl, server_ctrl) = spawn_pair(Config::default());
            let mut server_ctrl = server_ctrl;
            let mut client_ctrl = client_ctrl;

            let mut client_stream = client_ctrl.open_stream().await.unwrap();
            let accept = async_std::task::spawn(async move { server_ctrl.accept_stream().await.unwrap() });
            let mut server_stream = accept.await;

            client_stream.write2(b"ping").await.unwrap();
            let mut buf = [0u8; 4];
            server_stream.read2(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");

            server_stream.write2(b"pong").await.unwrap();
            let mut buf = [0u8; 4];
            client_stream.read2(&mut buf).await.unwrap();
            assert_eq!(&buf, b"pong");
        });
    }

    #[test]
    fn window_exhaustion_splits_large_write_into_credit_sized_chunks() {
        async_std::task::block_on(async {
            let mut config = Config::default();
            config.initial_window_size = 64;
            config.enable_window_auto_tuning = false;
            config.window_update_mode = WindowUpdateMode::OnRead;

            let (client_ctrl, server_ctrl) = spawn_pair(config);
            let mut server_ctrl = server_ctrl;
            let mut client_ctrl = client_ctrl;

            let client_stream = client_ctrl.open_stream().await.unwrap();
            let accept = async_std::task::spawn(async move { server_ctrl.accept_stream().await.unwrap() });
            let mut server_stream = accept.await;

            let payload = vec![7u8; 200];
            let writer = async_std::task::spawn({
                let mut client_stream = client_stream;
                async move {
                    let mut sent = 0;
                    let mut chunks = Vec::new();
                    while sent < payload.len() {
                        let n = client_stream.write2(&payload[sent..]).await.unwrap();
                        chunks.push(n);
                        sent += n;
                    }
                    chunks
                }
            });

            let total = 200;
            let mut got = 0usize;
            let mut buf = vec![0u8; 256];
            while got < total {
                let n = server_stream.read2(&mut buf[got..]).await.unwrap();
                assert!(n > 0);
                got += n;
            }

            let chunks = writer.await;
            assert_eq!(chunks.iter().sum::<usize>(), 200);
            assert!(chunks.len() >= 3, "expected the 64-byte initial window to force at least three chunks, got {:?}", chunks);
            assert_eq!(chunks[0], 64);
        });
    }

    #[test]
    fn stream_ids_never_reused_after_close() {
        async_std::task::block_on(async {
            let (client_ctrl, _server_ctrl) = spawn_pair(Config::default());
            let mut client_ctrl = client_ctrl;

            let mut first = client_ctrl.open_stream().await.unwrap();
            let first_id = first.id();
            first.close().await.unwrap();

            let second = client_ctrl.open_stream().await.unwrap();
            assert_ne!(first_id, second.id());
            assert!(second.id() > first_id);
        });
    }

    #[test]
    fn duplicate_syn_for_open_stream_is_rst_and_leaves_original_untouched() {
        async_std::task::block_on(async {
            // We act as the responder (`Mode::Server`): the peer opens with
            // odd ids, as an initiator does.
            let ((r, w), (_peer_r, _peer_w)) = pipe_pair();
            let (mut conn, _ctrl) = Connection::new(Id::random(), r, w, Mode::Server, Config::default());

            let mut first_syn = Frame::data(1, Vec::new()).unwrap();
            first_syn.header.syn();
            conn.dispatch_data(first_syn).await.unwrap();
            assert!(conn.streams.contains_key(&1));

            let mut duplicate_syn = Frame::data(1, Vec::new()).unwrap();
            duplicate_syn.header.syn();
            conn.dispatch_data(duplicate_syn).await.unwrap();

            // The duplicate SYN must not have disturbed the first stream.
            assert!(conn.streams.contains_key(&1));
            assert_eq!(conn.streams.get(&1).unwrap().shared().await.state, State::Open);
        });
    }

    #[test]
    fn on_receive_mode_emits_window_update_as_soon_as_data_arrives() {
        async_std::task::block_on(async {
            let ((r, w), (mut peer_r, _peer_w)) = pipe_pair();
            let mut config = Config::default();
            config.window_update_mode = WindowUpdateMode::OnReceive;
            config.initial_window_size = 64;
            let (mut conn, _ctrl) = Connection::new(Id::random(), r, w, Mode::Server, config);

            let mut syn = Frame::data(1, Vec::new()).unwrap();
            syn.header.syn();
            conn.dispatch_data(syn).await.unwrap();

            let data = Frame::data(1, vec![0u8; 64]).unwrap();
            conn.dispatch_data(data).await.unwrap();

            // In OnReceive mode the credit must be replenished right here, in
            // dispatch_data, rather than waiting for the application to read -
            // otherwise a transfer larger than one window stalls forever.
            let mut buf = [0u8; HEADER_LENGTH];
            peer_r.read2(&mut buf).await.unwrap();
            let mut pos = 0;
            let frame = FrameCodec::decode(&buf, &mut pos).unwrap().expect("a frame was written");
            assert_eq!(frame.header.tag, Tag::WindowUpdate);
            assert!(frame.header.length > 0, "OnReceive must emit a non-zero windowUpdate once data has landed");
        });
    }

    #[test]
    fn window_violation_wakes_parked_reader_instead_of_hanging_forever() {
        async_std::task::block_on(async {
            let ((r, w), (_peer_r, _peer_w)) = pipe_pair();
            let mut config = Config::default();
            config.initial_window_size = 16;
            let (mut conn, _ctrl) = Connection::new(Id::random(), r, w, Mode::Server, config);

            let mut syn = Frame::data(1, Vec::new()).unwrap();
            syn.header.syn();
            conn.dispatch_data(syn).await.unwrap();

            let mut stream = conn.streams.get(&1).unwrap().clone();
            let reader = async_std::task::spawn(async move {
                let mut buf = [0u8; 4];
                stream.read2(&mut buf).await
            });

            // Give the reader a chance to park on the empty buffer before the
            // violating frame arrives.
            async_std::task::sleep(Duration::from_millis(20)).await;

            // Exceeds the 16-byte window: a forced reset per spec.
            let oversized = Frame::data(1, vec![0u8; 32]).unwrap();
            conn.dispatch_data(oversized).await.unwrap();

            let result = async_std::future::timeout(Duration::from_millis(200), reader).await;
            assert!(
                matches!(result, Ok(Err(_))),
                "a reader parked before a window violation must be woken with an error, not left hanging"
            );
        });
    }

    #[test]
    fn keep_alive_timeout_detected_once_pending_ping_is_overdue() {
        let ((r1, w1), (_r2, _w2)) = pipe_pair();
        let mut config = Config::default();
        config.keep_alive_timeout = Duration::from_millis(1);
        let (mut conn, _ctrl) = Connection::new(Id::random(), r1, w1, Mode::Client, config);

        assert!(!conn.check_keep_alive_timeout());
        conn.pending_pings.insert(0, PendingPing { sent_at: Instant::now() - Duration::from_secs(1) });
        assert!(conn.check_keep_alive_timeout());
    }
}

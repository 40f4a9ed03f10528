use crate::media::{CaptureBackend, LocalStream, MediaConstraints, MediaDeviceManager};
use crate::peer::{ConnectionState, PeerConnectionManager, PeerEvent, RemoteStream};
use crate::session::call::CallSession;
use crate::session::event::SessionEvent;
use crate::session::state::SessionState;
use crate::session::timer::CallTimer;
use crate::signaling::{SignalingChannel, SignalingEvent, SignalingTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telecall_core::{
    CallError, IceServerConfig, NegotiationError, Participant, PeerInfo, Role, SessionConfig,
    SignalBody, SignalEnvelope, SignalingError,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

/// How long a degraded media connection may try to self-recover before the
/// session gives up and ends the call.
const DEGRADED_GRACE: Duration = Duration::from_secs(15);

/// Cadence for signaling reconnect attempts after a mid-call drop.
const SIGNALING_RETRY: Duration = Duration::from_secs(2);

enum SessionCommand {
    Start,
    ToggleAudio(oneshot::Sender<bool>),
    ToggleVideo(oneshot::Sender<bool>),
    EndCall(oneshot::Sender<()>),
}

/// Everything a successful initialization hands back to the driver.
type InitDone = (mpsc::Receiver<SignalingEvent>, LocalStream);

/// The one component the surrounding UI talks to. Commands cross into a
/// spawned driver task; state comes back as a watched `CallSession` snapshot
/// plus a stream of `SessionEvent`s. Dropping the controller closes the
/// command channel, which the driver observes as a hang-up.
pub struct CallSessionController {
    cmd_tx: mpsc::Sender<SessionCommand>,
    watch_rx: watch::Receiver<CallSession>,
}

impl CallSessionController {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn SignalingTransport>,
        capture: Arc<dyn CaptureBackend>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(64);

        let snapshot = CallSession::new(config.room_id.clone(), config.user_id.clone());
        let (watch_tx, watch_rx) = watch::channel(snapshot.clone());

        let channel = Arc::new(SignalingChannel::new(
            config.room_id.clone(),
            config.user_id.clone(),
            config.user_name.clone(),
            transport,
        ));
        let (peer, peer_rx) = PeerConnectionManager::new();
        let (timer, tick_rx) = CallTimer::new();

        let driver = SessionDriver {
            config,
            constraints: MediaConstraints::default(),
            devices: Arc::new(MediaDeviceManager::new(capture)),
            channel,
            peer: Arc::new(peer),
            snapshot,
            watch_tx,
            event_tx,
            cmd_rx,
            init_rx: None,
            peer_rx,
            signaling_rx: None,
            signaling_up: false,
            signaling_retry_at: None,
            timer,
            tick_rx,
            local: None,
            remote: RemoteStream::default(),
            remote_announced: false,
            conn_state: ConnectionState::New,
            degraded_deadline: None,
        };
        tokio::spawn(driver.run());

        (Self { cmd_tx, watch_rx }, event_rx)
    }

    /// Begin the session. No-op while a session is in flight; permitted
    /// again from `Failed`/`Ended` as the explicit retry path. Failures
    /// never surface here: they land in the `Failed` state with
    /// `last_error` set, so the calling UI stays renderable.
    pub async fn start(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Start).await;
    }

    /// Returns the realized audio enabled state.
    pub async fn toggle_audio(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(SessionCommand::ToggleAudio(reply_tx))
            .await;
        reply_rx.await.unwrap_or(false)
    }

    /// Returns the realized video enabled state.
    pub async fn toggle_video(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(SessionCommand::ToggleVideo(reply_tx))
            .await;
        reply_rx.await.unwrap_or(false)
    }

    /// Hang up and tear everything down. Idempotent; resolves once teardown
    /// has run to completion, even while initialization is still in flight.
    pub async fn end_call(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.cmd_tx.send(SessionCommand::EndCall(reply_tx)).await;
        let _ = reply_rx.await;
    }

    /// Current session snapshot.
    pub fn session(&self) -> CallSession {
        self.watch_rx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn watch(&self) -> watch::Receiver<CallSession> {
        self.watch_rx.clone()
    }
}

/// Event loop owning all session state. Lower-component callbacks arrive as
/// channel events and feed the transition table; nothing below this mutates
/// UI-visible state directly. Slow operations (initialization) run as
/// spawned tasks whose completion comes back through the loop, so commands
/// stay responsive while they are pending.
struct SessionDriver {
    config: SessionConfig,
    constraints: MediaConstraints,
    devices: Arc<MediaDeviceManager>,
    channel: Arc<SignalingChannel>,
    peer: Arc<PeerConnectionManager>,
    snapshot: CallSession,
    watch_tx: watch::Sender<CallSession>,
    event_tx: mpsc::Sender<SessionEvent>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    init_rx: Option<oneshot::Receiver<Result<InitDone, CallError>>>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    signaling_rx: Option<mpsc::Receiver<SignalingEvent>>,
    signaling_up: bool,
    signaling_retry_at: Option<tokio::time::Instant>,
    timer: CallTimer,
    tick_rx: mpsc::Receiver<()>,
    local: Option<LocalStream>,
    remote: RemoteStream,
    remote_announced: bool,
    conn_state: ConnectionState,
    degraded_deadline: Option<tokio::time::Instant>,
}

impl SessionDriver {
    async fn run(mut self) {
        info!(room = %self.config.room_id, "session driver started");

        loop {
            let deadline = self.degraded_deadline;
            let retry_at = self.signaling_retry_at;

            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("controller dropped; tearing down session");
                            if !self.snapshot.state.is_terminal() {
                                self.teardown(SessionState::Ended).await;
                            }
                            break;
                        }
                    }
                }

                result = async { self.init_rx.as_mut().unwrap().await },
                        if self.init_rx.is_some() => {
                    self.init_rx = None;
                    let result = result.unwrap_or_else(|_| {
                        Err(NegotiationError::Transport(
                            "initialization task aborted".into(),
                        )
                        .into())
                    });
                    self.handle_init_result(result).await;
                }

                event = async { self.signaling_rx.as_mut().unwrap().recv().await },
                        if self.signaling_rx.is_some() => {
                    match event {
                        Some(event) => self.handle_signaling(event).await,
                        None => self.signaling_rx = None,
                    }
                }

                Some(event) = self.peer_rx.recv() => {
                    self.handle_peer(event).await;
                }

                Some(()) = self.tick_rx.recv() => {
                    self.handle_tick();
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                        if deadline.is_some() => {
                    self.handle_grace_expired().await;
                }

                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(tokio::time::Instant::now)),
                        if retry_at.is_some() => {
                    self.signaling_retry_at = None;
                    self.retry_signaling().await;
                }
            }
        }

        // An initialization still in flight may yet bring resources up;
        // reap them once it settles.
        if let Some(pending) = self.init_rx.take() {
            let peer = Arc::clone(&self.peer);
            let devices = Arc::clone(&self.devices);
            let channel = Arc::clone(&self.channel);
            tokio::spawn(async move {
                if let Ok(Ok(_)) = pending.await {
                    peer.disconnect().await;
                    devices.release().await;
                    channel.disconnect().await;
                }
            });
        }

        info!(room = %self.config.room_id, "session driver finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Start => self.handle_start().await,
            SessionCommand::ToggleAudio(reply) => {
                let enabled = self.peer.toggle_audio().await;
                self.snapshot.is_muted = !enabled;
                self.publish();
                let _ = reply.send(enabled);
            }
            SessionCommand::ToggleVideo(reply) => {
                let enabled = self.peer.toggle_video().await;
                self.snapshot.is_video_off = !enabled;
                self.publish();
                let _ = reply.send(enabled);
            }
            SessionCommand::EndCall(reply) => {
                self.end_call_local().await;
                let _ = reply.send(());
            }
        }
    }

    async fn handle_start(&mut self) {
        if self.init_rx.is_some()
            || !matches!(
                self.snapshot.state,
                SessionState::Idle | SessionState::Ended | SessionState::Failed
            )
        {
            debug!(state = %self.snapshot.state, "start ignored: session already running");
            return;
        }

        // Fresh attempt: counters and diagnostics reset here and only here.
        self.snapshot.duration_seconds = 0;
        self.snapshot.started_at = None;
        self.snapshot.last_error = None;
        self.snapshot.peer = None;
        self.snapshot.is_muted = false;
        self.snapshot.is_video_off = false;
        self.remote = RemoteStream::default();
        self.remote_announced = false;
        self.conn_state = ConnectionState::New;
        self.degraded_deadline = None;
        self.signaling_retry_at = None;
        self.set_state(SessionState::Initializing).await;

        // Initialization suspends on network and device I/O; it runs off the
        // loop so end_call stays serviceable while it is pending.
        let (done_tx, done_rx) = oneshot::channel();
        self.init_rx = Some(done_rx);

        let channel = Arc::clone(&self.channel);
        let peer = Arc::clone(&self.peer);
        let devices = Arc::clone(&self.devices);
        let constraints = self.constraints.clone();
        let ice_servers = self.config.ice_servers.clone();
        tokio::spawn(async move {
            let result = run_initialize(channel, peer, devices, constraints, ice_servers).await;
            let _ = done_tx.send(result);
        });
    }

    async fn handle_init_result(&mut self, result: Result<InitDone, CallError>) {
        if self.snapshot.state.is_terminal() {
            // end_call won the race; whatever the late completion brought up
            // goes straight back down, with no state change.
            debug!("initialization finished after teardown; releasing");
            if result.is_ok() {
                self.peer.disconnect().await;
                self.devices.release().await;
                self.channel.disconnect().await;
            }
            return;
        }

        match result {
            Ok((events, stream)) => {
                self.signaling_rx = Some(events);
                self.signaling_up = true;
                self.local = Some(stream.clone());
                self.emit(SessionEvent::LocalStream(stream)).await;
                self.set_state(SessionState::WaitingForPeer).await;
            }
            Err(e) => {
                // run_initialize already rolled back everything it acquired.
                error!("session initialization failed: {}", e);
                self.snapshot.last_error = Some(e.clone());
                self.emit(SessionEvent::Error(e)).await;
                self.set_state(SessionState::Failed).await;
            }
        }
    }

    async fn end_call_local(&mut self) {
        if self.snapshot.state.is_terminal() {
            debug!("end_call on terminal session is a no-op");
            return;
        }

        // Hang-up signal first, while the channel may still be up.
        if let Err(e) = self.channel.broadcast(SignalBody::Leave).await {
            debug!("hang-up signal not delivered: {}", e);
        }
        self.teardown(SessionState::Ended).await;
        self.emit(SessionEvent::CallEnded).await;
    }

    /// Best-effort teardown: every step runs regardless of the others.
    async fn teardown(&mut self, terminal: SessionState) {
        self.timer.pause();
        self.degraded_deadline = None;
        self.signaling_retry_at = None;
        self.peer.disconnect().await;
        self.devices.release().await;
        self.channel.disconnect().await;
        self.signaling_rx = None;
        self.signaling_up = false;
        self.local = None;
        self.set_state(terminal).await;
    }

    async fn handle_signaling(&mut self, event: SignalingEvent) {
        // The session is the universal cancellation point: once terminal,
        // late completions must not mutate state.
        if self.snapshot.state.is_terminal() {
            return;
        }

        match event {
            SignalingEvent::Connected => debug!("signaling transport ready"),
            SignalingEvent::UserJoined(env) => self.handle_user_joined(env).await,
            SignalingEvent::Offer(env) => self.handle_offer(env).await,
            SignalingEvent::Answer(env) => self.handle_answer(env).await,
            SignalingEvent::IceCandidate(env) => self.handle_candidate(env).await,
            SignalingEvent::PeerLeft(_) | SignalingEvent::CallEnded(_) => {
                info!("remote peer ended the call");
                self.teardown(SessionState::Ended).await;
                self.emit(SessionEvent::CallEnded).await;
            }
            SignalingEvent::Error(e) => self.surface(CallError::Signaling(e)).await,
            SignalingEvent::Disconnected => self.handle_signaling_drop().await,
        }
    }

    async fn handle_user_joined(&mut self, env: SignalEnvelope) {
        let info = match &env.body {
            SignalBody::Join(info) | SignalBody::UserJoined(info) => info.clone(),
            _ => return,
        };
        if info.user_id == self.config.user_id {
            return;
        }
        if let Some(existing) = &self.snapshot.peer {
            if existing.user_id != info.user_id {
                warn!(user = %info.user_id, "ignoring third participant in two-party room");
            }
            return;
        }

        let we_offer = self.config.user_id < info.user_id;
        self.record_peer(info.clone(), we_offer);

        if self.snapshot.state != SessionState::WaitingForPeer {
            debug!("peer announcement outside waiting state; no negotiation triggered");
            return;
        }

        if we_offer {
            match self.peer.create_offer().await {
                Ok(sdp) => {
                    if let Err(e) = self
                        .channel
                        .send_to(info.user_id, SignalBody::Offer(sdp))
                        .await
                    {
                        self.surface(CallError::Signaling(e)).await;
                        return;
                    }
                    self.set_state(SessionState::Negotiating).await;
                }
                Err(e) => self.surface(CallError::Negotiation(e)).await,
            }
        }
        // Otherwise we are the answering side: negotiation begins when the
        // peer's offer arrives.
    }

    async fn handle_offer(&mut self, env: SignalEnvelope) {
        let SignalBody::Offer(sdp) = &env.body else {
            return;
        };
        if !matches!(
            self.snapshot.state,
            SessionState::WaitingForPeer | SessionState::Negotiating
        ) {
            debug!(state = %self.snapshot.state, "offer ignored in current state");
            return;
        }
        if self.snapshot.peer.is_none() {
            // A joiner can see the offer before any membership notification.
            self.record_peer(
                PeerInfo {
                    user_id: env.from_user_id.clone(),
                    display_name: env.from_user_id.to_string(),
                },
                false,
            );
        }

        match self.peer.create_answer(sdp).await {
            Ok(answer) => {
                if let Err(e) = self
                    .channel
                    .send_to(env.from_user_id.clone(), SignalBody::Answer(answer))
                    .await
                {
                    self.surface(CallError::Signaling(e)).await;
                    return;
                }
                if self.snapshot.state == SessionState::WaitingForPeer {
                    self.set_state(SessionState::Negotiating).await;
                }
            }
            Err(e) => self.surface(CallError::Negotiation(e)).await,
        }
    }

    async fn handle_answer(&mut self, env: SignalEnvelope) {
        let SignalBody::Answer(sdp) = &env.body else {
            return;
        };
        if let Err(e) = self.peer.apply_answer(sdp).await {
            self.surface(CallError::Negotiation(e)).await;
        }
    }

    async fn handle_candidate(&mut self, env: SignalEnvelope) {
        let SignalBody::IceCandidate(blob) = &env.body else {
            return;
        };
        if let Err(e) = self.peer.add_ice_candidate(blob.clone()).await {
            self.surface(CallError::Negotiation(e)).await;
        }
    }

    async fn handle_signaling_drop(&mut self) {
        warn!("signaling transport dropped");
        self.signaling_up = false;
        self.signaling_rx = None;
        self.channel.disconnect().await;

        match self.snapshot.state {
            SessionState::WaitingForPeer
            | SessionState::Negotiating
            | SessionState::Active
            | SessionState::Degraded => {
                // Signaling loss does not end a negotiated call; media may
                // keep flowing peer-to-peer while we reconnect.
                self.refresh_active_degraded().await;
                self.signaling_retry_at =
                    Some(tokio::time::Instant::now() + SIGNALING_RETRY);
            }
            _ => {}
        }
    }

    async fn retry_signaling(&mut self) {
        if self.snapshot.state.is_terminal() || self.signaling_up {
            return;
        }
        match self.channel.connect().await {
            Ok(events) => {
                self.signaling_rx = Some(events);
                self.signaling_up = true;
                // Re-announce membership only; reconnection never replays
                // offers, so renegotiation stays an explicit decision.
                if let Err(e) = self.channel.join_room().await {
                    warn!("rejoin after reconnect failed: {}", e);
                }
                info!("signaling reconnected");
                self.refresh_active_degraded().await;
            }
            Err(e) => {
                debug!("signaling reconnect failed: {}", e);
                self.signaling_retry_at =
                    Some(tokio::time::Instant::now() + SIGNALING_RETRY);
            }
        }
    }

    async fn handle_peer(&mut self, event: PeerEvent) {
        if self.snapshot.state.is_terminal() {
            return;
        }

        match event {
            PeerEvent::RemoteTrack(track) => {
                match track.kind() {
                    RTPCodecType::Audio => self.remote.audio = Some(track),
                    RTPCodecType::Video => self.remote.video = Some(track),
                    RTPCodecType::Unspecified => return,
                }
                self.remote_announced = true;
                self.emit(SessionEvent::RemoteStream(self.remote.clone()))
                    .await;
                self.maybe_activate().await;
            }
            PeerEvent::CandidateReady(blob) => {
                let result = match self.snapshot.peer.as_ref() {
                    Some(peer) => {
                        self.channel
                            .send_to(peer.user_id.clone(), SignalBody::IceCandidate(blob))
                            .await
                    }
                    None => self.channel.broadcast(SignalBody::IceCandidate(blob)).await,
                };
                if let Err(SignalingError::NotConnected) = result {
                    debug!("local candidate dropped: signaling down");
                } else if let Err(e) = result {
                    self.surface(CallError::Signaling(e)).await;
                }
            }
            PeerEvent::StateChanged(state) => self.handle_conn_state(state).await,
            PeerEvent::Fault(e) => self.surface(CallError::Negotiation(e)).await,
        }
    }

    async fn handle_conn_state(&mut self, state: ConnectionState) {
        debug!(%state, "connection state changed");
        self.conn_state = state;
        self.emit(SessionEvent::ConnectionQuality(state)).await;

        match state {
            ConnectionState::Connected => {
                self.degraded_deadline = None;
                if self.snapshot.state == SessionState::Negotiating {
                    self.maybe_activate().await;
                } else {
                    self.refresh_active_degraded().await;
                }
            }
            ConnectionState::Disconnected => {
                if self.snapshot.state.timer_runs() {
                    self.degraded_deadline =
                        Some(tokio::time::Instant::now() + DEGRADED_GRACE);
                    self.refresh_active_degraded().await;
                }
            }
            ConnectionState::Failed => {
                warn!("media connection failed");
                self.snapshot.last_error = Some(CallError::ConnectionFailure);
                self.emit(SessionEvent::Error(CallError::ConnectionFailure))
                    .await;
                self.teardown(SessionState::Ended).await;
                self.emit(SessionEvent::CallEnded).await;
            }
            ConnectionState::New | ConnectionState::Connecting | ConnectionState::Closed => {}
        }
    }

    async fn handle_grace_expired(&mut self) {
        self.degraded_deadline = None;
        if self.snapshot.state == SessionState::Degraded
            && self.conn_state != ConnectionState::Connected
        {
            warn!("degraded grace window expired without recovery");
            self.snapshot.last_error = Some(CallError::ConnectionFailure);
            self.emit(SessionEvent::Error(CallError::ConnectionFailure))
                .await;
            self.teardown(SessionState::Ended).await;
            self.emit(SessionEvent::CallEnded).await;
        }
    }

    fn handle_tick(&mut self) {
        if self.snapshot.state.timer_runs() {
            self.snapshot.duration_seconds += 1;
            self.publish();
        }
    }

    /// `Negotiating → Active` needs both remote media and a connected
    /// transport, in either order.
    async fn maybe_activate(&mut self) {
        if self.snapshot.state == SessionState::Negotiating
            && self.remote_announced
            && self.conn_state == ConnectionState::Connected
        {
            if self.snapshot.started_at.is_none() {
                self.snapshot.started_at = Some(Instant::now());
            }
            self.timer.start();
            self.set_state(SessionState::Active).await;
        }
    }

    /// Reconcile `Active ↔ Degraded` from transport and signaling health.
    async fn refresh_active_degraded(&mut self) {
        let healthy = self.conn_state == ConnectionState::Connected && self.signaling_up;
        match (self.snapshot.state, healthy) {
            (SessionState::Active, false) => self.set_state(SessionState::Degraded).await,
            (SessionState::Degraded, true) => {
                self.degraded_deadline = None;
                self.set_state(SessionState::Active).await;
            }
            _ => {}
        }
    }

    fn record_peer(&mut self, info: PeerInfo, we_offer: bool) {
        let display_name = self
            .config
            .peer_display_name
            .clone()
            .unwrap_or(info.display_name);
        let role = if we_offer { Role::Callee } else { Role::Caller };
        info!(user = %info.user_id, "peer present in room");
        self.snapshot.peer = Some(Participant::new(info.user_id, display_name, role));
        self.publish();
    }

    async fn surface(&mut self, error: CallError) {
        warn!("session error surfaced: {}", error);
        self.snapshot.last_error = Some(error.clone());
        self.publish();
        self.emit(SessionEvent::Error(error)).await;
    }

    async fn set_state(&mut self, state: SessionState) {
        if self.snapshot.state == state {
            return;
        }
        info!(from = %self.snapshot.state, to = %state, "session state");
        self.snapshot.state = state;
        self.publish();
        self.emit(SessionEvent::StateChanged(state)).await;
    }

    fn publish(&self) {
        self.watch_tx.send_replace(self.snapshot.clone());
    }

    async fn emit(&self, event: SessionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("session event dropped: consumer gone");
        }
    }
}

/// Bring up signaling, transport and media for one attempt. Rolls back on
/// its own failures, so an `Err` means nothing is left held.
async fn run_initialize(
    channel: Arc<SignalingChannel>,
    peer: Arc<PeerConnectionManager>,
    devices: Arc<MediaDeviceManager>,
    constraints: MediaConstraints,
    ice_servers: Vec<IceServerConfig>,
) -> Result<InitDone, CallError> {
    let events = channel.connect().await.map_err(CallError::Signaling)?;

    if let Err(e) = peer.initialize(&ice_servers).await {
        channel.disconnect().await;
        return Err(CallError::Negotiation(e));
    }

    let stream = match peer.user_media(&devices, &constraints).await {
        Ok(stream) => stream,
        Err(e) => {
            peer.disconnect().await;
            channel.disconnect().await;
            return Err(e);
        }
    };

    if let Err(e) = channel.join_room().await {
        peer.disconnect().await;
        devices.release().await;
        channel.disconnect().await;
        return Err(CallError::Signaling(e));
    }

    Ok((events, stream))
}

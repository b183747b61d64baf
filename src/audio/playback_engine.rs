//! Session thread driving a [`Trainer`] in real time
//!
//! The trainer, its clock and its tick source all live on one dedicated
//! thread. The REPL talks to it over a command channel and listens for
//! boundary events on a second channel.

use crate::audio::audio::OutputClock;
use crate::audio::clock::{FrameTicker, SilentClock};
use anyhow::{Result, anyhow};
use backbeat_core::engine::AudioClock;
use backbeat_core::{Notification, Pattern, Trainer, TrainerConfig, TrainerSnapshot};
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const EVENT_BUFFER: usize = 64;
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

type Reply = Sender<backbeat_core::error::Result<()>>;
type SessionTrainer = Trainer<Box<dyn AudioClock>, FrameTicker>;

/// Where scheduled sounds go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Default cpal output device
    Speakers,
    /// No device; wall-clock timing only
    Silent,
}

/// Commands that can be sent to the session thread
#[derive(Debug)]
pub enum SessionCommand {
    Start,
    Stop,
    SetTempo(f64, Reply),
    SetBackgrounded(bool),
    /// `None` draws a random seed
    Reseed(Option<f64>, Reply),
    Snapshot(Sender<TrainerSnapshot>),
    Shutdown,
}

/// A boundary event with the patterns in effect right after it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub notification: Notification,
    pub current: Pattern,
    pub next: Pattern,
}

/// Handle to the running session thread
pub struct PlaybackEngine {
    command_tx: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    is_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Spawn the session thread. Fails if the audio backend cannot open.
    pub fn spawn(config: TrainerConfig, backend: Backend) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = unbounded();
        let (event_tx, events) = bounded(EVENT_BUFFER);
        let (ready_tx, ready_rx) = bounded(1);
        let is_running = Arc::new(AtomicBool::new(false));
        let is_running_clone = is_running.clone();

        // cpal streams are not Send, so the clock is built on the session thread
        let thread = thread::Builder::new()
            .name("backbeat-session".into())
            .spawn(move || {
                let session = SessionLoop::open(config, backend, command_rx, event_tx, is_running_clone);
                match session {
                    Ok(session) => {
                        let _ = ready_tx.send(Ok(()));
                        session.run();
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("Session thread exited during setup"))??;

        Ok(PlaybackEngine {
            command_tx,
            events,
            is_running,
            thread: Some(thread),
        })
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| anyhow!("Failed to send command: {}", e))
    }

    fn request(&self, build: impl FnOnce(Reply) -> SessionCommand) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(build(reply_tx))?;
        reply_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| anyhow!("Session did not answer: {}", e))?
            .map_err(Into::into)
    }

    pub fn start(&self) -> Result<()> {
        self.send(SessionCommand::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(SessionCommand::Stop)
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<()> {
        self.request(|reply| SessionCommand::SetTempo(bpm, reply))
    }

    pub fn set_backgrounded(&self, backgrounded: bool) -> Result<()> {
        self.send(SessionCommand::SetBackgrounded(backgrounded))
    }

    pub fn reseed(&self, seed: Option<f64>) -> Result<()> {
        self.request(|reply| SessionCommand::Reseed(seed, reply))
    }

    pub fn snapshot(&self) -> Result<TrainerSnapshot> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(SessionCommand::Snapshot(reply_tx))?;
        reply_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| anyhow!("Session did not answer: {}", e))
    }

    /// Boundary events, in order; missed events are dropped when nobody reads
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

enum LoopAction {
    Continue,
    Shutdown,
}

/// Internal loop that owns the trainer
struct SessionLoop {
    trainer: SessionTrainer,
    frames: Receiver<std::time::Instant>,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
    is_running: Arc<AtomicBool>,
}

impl SessionLoop {
    fn open(
        config: TrainerConfig,
        backend: Backend,
        command_rx: Receiver<SessionCommand>,
        event_tx: Sender<SessionEvent>,
        is_running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let clock: Box<dyn AudioClock> = match backend {
            Backend::Speakers => Box::new(OutputClock::new()?),
            Backend::Silent => Box::new(SilentClock::new()),
        };
        let ticker = FrameTicker::new();
        let frames = ticker.frames();
        let trainer = Trainer::new(config, clock, ticker)?;

        log::info!("Session ready ({:?} backend, {} BPM)", backend, trainer.tempo());

        Ok(Self {
            trainer,
            frames,
            command_rx,
            event_tx,
            is_running,
        })
    }

    fn run(mut self) {
        let commands = self.command_rx.clone();
        let frames = self.frames.clone();
        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => {
                        if let LoopAction::Shutdown = self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => break, // Channel closed
                },
                recv(frames) -> _ => self.on_frame(),
            }
        }

        self.trainer.stop();
        self.is_running.store(false, Ordering::Relaxed);
        log::debug!("Session thread exiting");
    }

    fn handle_command(&mut self, command: SessionCommand) -> LoopAction {
        match command {
            SessionCommand::Start => {
                let report = self.trainer.start();
                log::info!("Started at {} BPM", self.trainer.tempo());
                log::debug!("First pass scheduled {} sound(s)", report.sounds);
                self.publish();
            }
            SessionCommand::Stop => {
                self.trainer.stop();
                log::info!("Stopped");
            }
            SessionCommand::SetTempo(bpm, reply) => {
                let _ = reply.send(self.trainer.set_tempo(bpm));
            }
            SessionCommand::SetBackgrounded(backgrounded) => {
                self.trainer.set_backgrounded(backgrounded);
            }
            SessionCommand::Reseed(seed, reply) => {
                let result = match seed {
                    Some(seed) => self.trainer.set_seed(seed),
                    None => {
                        self.trainer.reseed();
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.trainer.snapshot());
            }
            SessionCommand::Shutdown => return LoopAction::Shutdown,
        }
        self.is_running
            .store(self.trainer.is_running(), Ordering::Relaxed);
        LoopAction::Continue
    }

    fn on_frame(&mut self) {
        let armed = self.trainer.engine_mut().ticks_mut().take_armed();
        if let Some(handle) = armed {
            self.trainer.tick(handle);
            self.publish();
        }
        self.is_running
            .store(self.trainer.is_running(), Ordering::Relaxed);
    }

    fn publish(&mut self) {
        for notification in self.trainer.drain_notifications() {
            let event = SessionEvent {
                notification,
                current: self.trainer.current_pattern(),
                next: self.trainer.next_pattern(),
            };
            if self.event_tx.try_send(event).is_err() {
                log::trace!("Event buffer full; dropped {:?}", notification);
            }
        }
    }
}

//! WASM bindings for backbeat-core
//!
//! Plugs the trainer into the browser: Web Audio supplies the clock and
//! plays the decoded samples, `requestAnimationFrame` supplies the ticks.
//!
//! ```javascript
//! import init, { BrowserTrainer } from './backbeat_core.js';
//!
//! await init();
//! const trainer = new BrowserTrainer(120);
//! const ctx = trainer.audio_context();
//! trainer.set_sounds(await decode(ctx, clickMp3), await decode(ctx, rhythmMp3));
//! trainer.on_pattern_complete(() => redraw(trainer.current_pattern(), trainer.next_pattern()));
//! trainer.on_bar_complete((bar) => showPhase(bar));
//! document.addEventListener('visibilitychange', () => trainer.set_backgrounded(document.hidden));
//! trainer.start();
//! ```

#![cfg(feature = "wasm")]

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AudioBuffer, AudioContext, AudioContextState};

use crate::config::TrainerConfig;
use crate::engine::{AudioClock, TickHandle, TickSource};
use crate::error::ClockError;
use crate::trainer::Trainer;
use crate::types::{Notification, ScheduledSound, SoundKind};

/// Install the panic hook and route `log` output to the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[backbeat] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            _ => web_sys::console::log_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Audio clock backed by a Web Audio context.
///
/// Sample decoding happens in JavaScript; this only plays the buffers it
/// was handed.
pub struct WebAudioClock {
    context: AudioContext,
    click: Option<AudioBuffer>,
    rhythm: Option<AudioBuffer>,
}

impl WebAudioClock {
    pub fn new(context: AudioContext) -> Self {
        Self {
            context,
            click: None,
            rhythm: None,
        }
    }

    pub fn set_buffers(&mut self, click: AudioBuffer, rhythm: AudioBuffer) {
        self.click = Some(click);
        self.rhythm = Some(rhythm);
    }

    fn play_at(&self, buffer: &AudioBuffer, when: f64) -> Result<(), JsValue> {
        let source = self.context.create_buffer_source()?;
        source.set_buffer(Some(buffer));
        source.connect_with_audio_node(&self.context.destination())?;
        source.start_with_when(when)?;
        Ok(())
    }
}

impl AudioClock for WebAudioClock {
    fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        if self.context.state() == AudioContextState::Suspended {
            // The returned promise settles later; rejection surfaces in JS
            let _promise = self
                .context
                .resume()
                .map_err(|e| ClockError::new(format!("{:?}", e)))?;
        }
        Ok(())
    }

    fn schedule(&mut self, sound: &ScheduledSound) {
        let buffer = match sound.kind {
            SoundKind::Click { .. } => self.click.as_ref(),
            SoundKind::RhythmHit => self.rhythm.as_ref(),
        };
        let Some(buffer) = buffer else {
            log::debug!("no {} sample loaded yet", sound.kind.name());
            return;
        };
        if let Err(e) = self.play_at(buffer, sound.time) {
            log::warn!("failed to schedule {}: {:?}", sound.kind.name(), e);
        }
    }
}

/// Tick source over `requestAnimationFrame`
pub struct AnimationFrameTicks {
    window: web_sys::Window,
    callback: js_sys::Function,
}

impl TickSource for AnimationFrameTicks {
    fn request_tick(&mut self) -> TickHandle {
        match self.window.request_animation_frame(&self.callback) {
            Ok(id) => TickHandle(id as u64),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                TickHandle(0)
            }
        }
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0 as i32) {
            log::warn!("cancelAnimationFrame failed: {:?}", e);
        }
    }
}

type BrowserInner = Trainer<WebAudioClock, AnimationFrameTicks>;

#[derive(Default)]
struct JsCallbacks {
    pattern_complete: Option<js_sys::Function>,
    bar_complete: Option<js_sys::Function>,
}

/// Call the JS handlers. Runs with no trainer borrow held, so handlers may
/// call back into the trainer (including `stop`).
fn dispatch(callbacks: &Rc<RefCell<JsCallbacks>>, notifications: &[Notification]) {
    if notifications.is_empty() {
        return;
    }
    let (on_pattern, on_bar) = {
        let callbacks = callbacks.borrow();
        (
            callbacks.pattern_complete.clone(),
            callbacks.bar_complete.clone(),
        )
    };

    for notification in notifications {
        let result = match (notification, &on_pattern, &on_bar) {
            (Notification::PatternComplete { .. }, Some(f), _) => f.call0(&JsValue::NULL),
            (Notification::BarComplete { bar_index, .. }, _, Some(f)) => {
                f.call1(&JsValue::NULL, &JsValue::from(*bar_index))
            }
            _ => Ok(JsValue::UNDEFINED),
        };
        if let Err(e) = result {
            log::error!("callback threw: {:?}", e);
        }
    }
}

fn run_frame(slot: &Rc<RefCell<Option<BrowserInner>>>, callbacks: &Rc<RefCell<JsCallbacks>>) {
    let notifications = {
        let Ok(mut guard) = slot.try_borrow_mut() else {
            return;
        };
        let Some(trainer) = guard.as_mut() else {
            return;
        };
        // Cancelled frames never fire, so the armed handle is this frame's
        if let Some(handle) = trainer.engine().pending_tick() {
            trainer.tick(handle);
        }
        trainer.drain_notifications()
    };
    dispatch(callbacks, &notifications);
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Rhythm trainer exposed to JavaScript
#[wasm_bindgen]
pub struct BrowserTrainer {
    inner: Rc<RefCell<Option<BrowserInner>>>,
    callbacks: Rc<RefCell<JsCallbacks>>,
    _frame: Closure<dyn FnMut(f64)>,
}

#[wasm_bindgen]
impl BrowserTrainer {
    /// Create a trainer with its own `AudioContext`
    #[wasm_bindgen(constructor)]
    pub fn new(bpm: f64) -> Result<BrowserTrainer, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let context = AudioContext::new()?;

        let inner: Rc<RefCell<Option<BrowserInner>>> = Rc::new(RefCell::new(None));
        let callbacks = Rc::new(RefCell::new(JsCallbacks::default()));

        let frame = {
            let inner = Rc::clone(&inner);
            let callbacks = Rc::clone(&callbacks);
            Closure::wrap(Box::new(move |_timestamp: f64| {
                run_frame(&inner, &callbacks);
            }) as Box<dyn FnMut(f64)>)
        };

        let ticks = AnimationFrameTicks {
            window,
            callback: frame.as_ref().unchecked_ref::<js_sys::Function>().clone(),
        };
        let config = TrainerConfig::default().with_tempo(bpm);
        let trainer = Trainer::new(config, WebAudioClock::new(context), ticks).map_err(to_js)?;
        *inner.borrow_mut() = Some(trainer);

        Ok(BrowserTrainer {
            inner,
            callbacks,
            _frame: frame,
        })
    }

    fn with_trainer<R>(&self, f: impl FnOnce(&mut BrowserInner) -> R) -> Result<R, JsValue> {
        let mut guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("trainer is busy"))?;
        let trainer = guard
            .as_mut()
            .ok_or_else(|| JsValue::from_str("trainer is not initialised"))?;
        Ok(f(trainer))
    }

    /// The context samples must be decoded with
    pub fn audio_context(&self) -> Result<AudioContext, JsValue> {
        self.with_trainer(|t| t.engine().clock().context.clone())
    }

    pub fn set_sounds(&self, click: AudioBuffer, rhythm: AudioBuffer) -> Result<(), JsValue> {
        self.with_trainer(|t| t.engine_mut().clock_mut().set_buffers(click, rhythm))
    }

    pub fn start(&self) -> Result<(), JsValue> {
        let notifications = self.with_trainer(|t| {
            t.start();
            t.drain_notifications()
        })?;
        dispatch(&self.callbacks, &notifications);
        Ok(())
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        self.with_trainer(|t| t.stop())
    }

    pub fn is_running(&self) -> Result<bool, JsValue> {
        self.with_trainer(|t| t.is_running())
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<(), JsValue> {
        self.with_trainer(|t| t.set_tempo(bpm))?.map_err(to_js)
    }

    pub fn tempo(&self) -> Result<f64, JsValue> {
        self.with_trainer(|t| t.tempo())
    }

    /// Feed `document.hidden` here on every `visibilitychange`
    pub fn set_backgrounded(&self, hidden: bool) -> Result<(), JsValue> {
        self.with_trainer(|t| t.set_backgrounded(hidden))
    }

    pub fn reseed(&self) -> Result<(), JsValue> {
        self.with_trainer(|t| t.reseed())
    }

    /// Steps of the pattern now playing, as 0/1 bytes
    pub fn current_pattern(&self) -> Result<Vec<u8>, JsValue> {
        self.with_trainer(|t| t.current_pattern().to_bytes().to_vec())
    }

    /// Steps of the pattern that plays after the current one
    pub fn next_pattern(&self) -> Result<Vec<u8>, JsValue> {
        self.with_trainer(|t| t.next_pattern().to_bytes().to_vec())
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.with_trainer(|t| t.snapshot())?;
        serde_wasm_bindgen::to_value(&snapshot).map_err(to_js)
    }

    /// Handler called with no arguments when a two-bar cycle completes
    pub fn on_pattern_complete(&self, callback: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().pattern_complete = callback;
    }

    /// Handler called with the alternating bar index (0 or 1)
    pub fn on_bar_complete(&self, callback: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().bar_complete = callback;
    }
}

impl Drop for BrowserTrainer {
    fn drop(&mut self) {
        // A pending frame would otherwise call into a freed closure
        if let Ok(mut guard) = self.inner.try_borrow_mut() {
            if let Some(trainer) = guard.as_mut() {
                trainer.stop();
            }
        }
    }
}

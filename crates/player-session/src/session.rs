//! Single-threaded control loop.
//!
//! All state mutation happens on the thread that owns the
//! [`PlayerController`]. UI commands, engine events and position ticks are
//! multiplexed onto it with `select!`, so no locks guard the session state.

use crossbeam_channel::{Receiver, select};
use player_types::{Track, TrackId};

use crate::controller::PlayerController;
use crate::engine::{AudioBackend, EngineMessage};

/// A user-level request against the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Play(Track),
    TogglePlay,
    SetVolume(f32),
    Stop,
    Next,
    Previous,
    Enqueue(Track),
    ClearQueue,
    Remove(TrackId),
    ToggleLike(Track),
    Seek(f64),
    SeekBy(f64),
    SetLibrary(Vec<Track>),
    SetMoodFilter(Option<String>),
    SetUserName(String),
    Shutdown,
}

/// One unit of work for the control loop.
#[derive(Debug)]
pub enum Input<T> {
    Command(T),
    Engine(EngineMessage),
    Tick,
    /// The command channel closed.
    Closed,
}

/// Block until the next command, engine event or position tick arrives.
pub fn next_input<B: AudioBackend, T>(
    controller: &PlayerController<B>,
    commands: &Receiver<T>,
) -> Input<T> {
    let ticks = controller.engine().poller().receiver();
    let events = controller.engine().events();
    select! {
        recv(commands) -> msg => match msg {
            Ok(cmd) => Input::Command(cmd),
            Err(_) => Input::Closed,
        },
        recv(events) -> msg => match msg {
            Ok(message) => Input::Engine(message),
            Err(_) => Input::Closed,
        },
        recv(ticks) -> _ => Input::Tick,
    }
}

impl<B: AudioBackend> PlayerController<B> {
    /// Apply `intent`. Returns `false` for [`Intent::Shutdown`].
    pub fn apply(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Play(track) => self.set_current_track(track),
            Intent::TogglePlay => self.toggle_play(),
            Intent::SetVolume(volume) => self.set_volume(volume),
            Intent::Stop => self.stop(),
            Intent::Next => {
                if let Err(miss) = self.play_next() {
                    tracing::debug!(reason = %miss, "next: nothing to play");
                }
            }
            Intent::Previous => {
                if let Err(miss) = self.play_previous() {
                    tracing::debug!(reason = %miss, "previous: nothing to play");
                }
            }
            Intent::Enqueue(track) => self.enqueue(track),
            Intent::ClearQueue => self.clear_queue(),
            Intent::Remove(id) => {
                self.remove_track(&id);
            }
            Intent::ToggleLike(track) => {
                self.toggle_like(&track);
            }
            Intent::Seek(secs) => self.seek(secs),
            Intent::SeekBy(delta) => self.seek_by(delta),
            Intent::SetLibrary(tracks) => self.set_library(tracks),
            Intent::SetMoodFilter(mood) => self.set_mood_filter(mood),
            Intent::SetUserName(name) => self.set_user_name(&name),
            Intent::Shutdown => return false,
        }
        true
    }
}

/// Whether the control loop keeps going after an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owner of a controller that [`drive`] feeds inputs to.
pub trait SessionDriver {
    type Backend: AudioBackend;
    type Command;

    fn controller(&self) -> &PlayerController<Self::Backend>;

    fn controller_mut(&mut self) -> &mut PlayerController<Self::Backend>;

    fn command(&mut self, command: Self::Command) -> Flow;

    fn engine_message(&mut self, message: EngineMessage) {
        self.controller_mut().handle_engine_message(message);
    }

    /// Runs after every input that did not end the loop, and once more after
    /// the final stop.
    fn after_input(&mut self) {}
}

/// Run the control loop until a command returns [`Flow::Quit`] or `commands`
/// closes, then stop playback.
pub fn drive<D: SessionDriver>(driver: &mut D, commands: &Receiver<D::Command>) {
    loop {
        let flow = match next_input(driver.controller(), commands) {
            Input::Command(command) => driver.command(command),
            Input::Engine(message) => {
                driver.engine_message(message);
                Flow::Continue
            }
            Input::Tick => {
                driver.controller_mut().poll_position();
                Flow::Continue
            }
            Input::Closed => Flow::Quit,
        };
        if flow == Flow::Quit {
            break;
        }
        driver.after_input();
    }
    driver.controller_mut().stop();
    driver.after_input();
    tracing::info!("session loop exited");
}

struct Observed<'a, B: AudioBackend, F> {
    controller: &'a mut PlayerController<B>,
    observe: F,
}

impl<B, F> SessionDriver for Observed<'_, B, F>
where
    B: AudioBackend,
    F: FnMut(&PlayerController<B>),
{
    type Backend = B;
    type Command = Intent;

    fn controller(&self) -> &PlayerController<B> {
        self.controller
    }

    fn controller_mut(&mut self) -> &mut PlayerController<B> {
        self.controller
    }

    fn command(&mut self, intent: Intent) -> Flow {
        if self.controller.apply(intent) {
            Flow::Continue
        } else {
            Flow::Quit
        }
    }

    fn after_input(&mut self) {
        (self.observe)(self.controller);
    }
}

/// Drive `controller` from `intents` until shutdown or the channel closes.
///
/// `observe` runs after every processed input.
pub fn run<B, F>(controller: &mut PlayerController<B>, intents: &Receiver<Intent>, observe: F)
where
    B: AudioBackend,
    F: FnMut(&PlayerController<B>),
{
    drive(&mut Observed { controller, observe }, intents);
}

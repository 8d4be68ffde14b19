//! Interactive command shell.
//!
//! Owns the [`PlayerController`] and runs the control loop on the calling
//! thread. Lines typed by the user arrive over a channel from a reader
//! thread and are multiplexed with engine events and position ticks.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use crossbeam_channel::Receiver;
use player_session::session::{self, Flow, SessionDriver};
use player_session::{
    AudioBackend, EngineMessage, Intent, PersistedState, PlaybackError, PlayerController,
};
use player_types::{Track, format_time};

use crate::catalog::CatalogClient;
use crate::commands::{self, Command, HELP, Target};

pub struct Shell<B: AudioBackend, W: Write> {
    controller: PlayerController<B>,
    catalog: CatalogClient,
    state_path: PathBuf,
    saved: PersistedState,
    /// Rows of the last printed track listing; `Target::Row` indexes into it.
    view: Vec<Track>,
    out: W,
}

impl<B: AudioBackend, W: Write> Shell<B, W> {
    pub fn new(
        controller: PlayerController<B>,
        catalog: CatalogClient,
        state_path: PathBuf,
        out: W,
    ) -> Self {
        let saved = controller.persisted();
        Self {
            controller,
            catalog,
            state_path,
            saved,
            view: Vec::new(),
            out,
        }
    }

    pub fn controller(&self) -> &PlayerController<B> {
        &self.controller
    }

    /// Pull the library from the catalog. Failures keep the current library.
    pub fn refresh_library(&mut self) {
        match self.catalog.songs() {
            Ok(tracks) => {
                self.controller.apply(Intent::SetLibrary(tracks));
                self.view = self.controller.visible_library().into_iter().cloned().collect();
            }
            Err(e) => {
                tracing::warn!("library refresh failed: {e:#}");
                self.say(format_args!("could not load library: {e:#}"));
            }
        }
    }

    /// Run until `quit` or until `lines` closes, then stop playback and save.
    pub fn run(&mut self, lines: &Receiver<String>) -> Result<()> {
        session::drive(self, lines);
        tracing::info!("shell exited");
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match commands::parse(line) {
            Ok(Some(cmd)) => self.execute(cmd),
            Ok(None) => Flow::Continue,
            Err(e) => {
                self.say(format_args!("{e:#}"));
                Flow::Continue
            }
        }
    }

    fn handle_engine(&mut self, message: EngineMessage) {
        let before_track = self.controller.state().current_id().map(str::to_string);
        let before_error = self.controller.last_error().cloned();
        if !self.controller.handle_engine_message(message) {
            return;
        }
        let after_track = self.controller.state().current_id().map(str::to_string);
        if after_track != before_track && self.controller.state().is_playing {
            self.print_now_playing();
        }
        let error = self.controller.last_error().cloned();
        if let Some(err) = error.filter(|e| Some(e) != before_error.as_ref()) {
            self.say(format_args!("playback error: {err}"));
        }
    }

    fn execute(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::List => {
                self.view = self.controller.visible_library().into_iter().cloned().collect();
                self.print_view("library");
            }
            Command::Play(target) => match self.resolve(&target) {
                Some(track) => {
                    self.controller.apply(Intent::Play(track));
                    self.print_now_playing();
                }
                None => self.no_such(&target),
            },
            Command::Pause => {
                if self.controller.state().current_track.is_none() {
                    self.say(format_args!("nothing is playing"));
                } else {
                    self.controller.apply(Intent::TogglePlay);
                    self.print_status();
                }
            }
            Command::Stop => {
                self.controller.apply(Intent::Stop);
                self.print_status();
            }
            Command::Next => self.step(Intent::Next),
            Command::Prev => self.step(Intent::Previous),
            Command::Volume(volume) => {
                self.controller.apply(Intent::SetVolume(volume));
                let volume = self.controller.state().volume;
                self.say(format_args!("volume {:.0}%", volume * 100.0));
            }
            Command::Seek(secs) => {
                self.controller.apply(Intent::Seek(secs));
                self.print_status();
            }
            Command::SeekBy(delta) => {
                self.controller.apply(Intent::SeekBy(delta));
                self.print_status();
            }
            Command::ShowQueue => {
                self.view = self.controller.queue().to_vec();
                self.print_view("queue");
            }
            Command::Enqueue(target) => match self.resolve(&target) {
                Some(track) => {
                    self.say(format_args!("queued {}", track.display_title()));
                    self.controller.apply(Intent::Enqueue(track));
                }
                None => self.no_such(&target),
            },
            Command::ClearQueue => {
                self.controller.apply(Intent::ClearQueue);
                self.say(format_args!("queue cleared"));
            }
            Command::Like(target) => {
                let track = match &target {
                    Some(target) => self.resolve(target),
                    None => self.controller.state().current_track.clone(),
                };
                match track {
                    Some(track) => {
                        self.controller.apply(Intent::ToggleLike(track.clone()));
                        let verb = if self.controller.is_liked(&track.id) { "liked" } else { "unliked" };
                        self.say(format_args!("{verb} {}", track.display_title()));
                    }
                    None => match target {
                        Some(target) => self.no_such(&target),
                        None => self.say(format_args!("nothing is playing")),
                    },
                }
            }
            Command::Remove(target) => match self.resolve(&target) {
                Some(track) => self.remove(track),
                None => self.no_such(&target),
            },
            Command::Mood(mood) => self.mood(mood),
            Command::Playlists => self.playlists(),
            Command::Playlist(id) => self.playlist(&id),
            Command::PlaylistAdd { playlist, target } => self.playlist_add(&playlist, &target),
            Command::PlaylistRemove { playlist, target } => self.playlist_remove(&playlist, &target),
            Command::Stats => self.stats(),
            Command::Status => self.print_status(),
            Command::Liked => {
                self.view = self
                    .controller
                    .collections()
                    .liked_tracks()
                    .into_iter()
                    .cloned()
                    .collect();
                self.print_view("liked");
            }
            Command::Refresh => {
                self.refresh_library();
                self.say(format_args!("{} tracks", self.controller.library().len()));
            }
            Command::Name(name) => {
                self.controller.apply(Intent::SetUserName(name));
                let user = self.controller.user();
                let line = format!("signed in as {} ({})", user.name, user.id);
                self.say(format_args!("{line}"));
            }
            Command::Help => self.say(format_args!("{HELP}")),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn step(&mut self, intent: Intent) {
        if self.controller.state().current_track.is_none() {
            self.say(format_args!("nothing is playing"));
            return;
        }
        self.controller.apply(intent);
        self.print_now_playing();
    }

    fn remove(&mut self, track: Track) {
        if let Err(e) = self.catalog.delete_song(&track.id) {
            tracing::warn!(track_id = %track.id, "delete failed: {e:#}");
            self.say(format_args!("could not delete {}: {e:#}", track.display_title()));
            return;
        }
        self.controller.apply(Intent::Remove(track.id.clone()));
        self.view.retain(|t| t.id != track.id);
        self.say(format_args!("deleted {}", track.display_title()));
    }

    fn mood(&mut self, mood: Option<String>) {
        let Some(mood) = mood else {
            self.controller.apply(Intent::SetMoodFilter(None));
            self.say(format_args!("mood filter cleared"));
            return;
        };
        // Merge in server-side matches the local library has not seen yet.
        match self.catalog.songs_by_mood(&mood) {
            Ok(found) => {
                let mut library = self.controller.library().to_vec();
                let known: Vec<String> = library.iter().map(|t| t.id.clone()).collect();
                let fresh: Vec<Track> = found.into_iter().filter(|t| !known.contains(&t.id)).collect();
                if !fresh.is_empty() {
                    library.extend(fresh);
                    self.controller.apply(Intent::SetLibrary(library));
                }
            }
            Err(e) => tracing::warn!(mood = %mood, "mood lookup failed: {e:#}"),
        }
        self.controller.apply(Intent::SetMoodFilter(Some(mood.clone())));
        self.view = self.controller.visible_library().into_iter().cloned().collect();
        self.print_view(&format!("mood: {mood}"));
    }

    fn playlists(&mut self) {
        match self.catalog.playlists() {
            Ok(lists) if lists.is_empty() => self.say(format_args!("no playlists")),
            Ok(lists) => {
                for list in lists {
                    let line = format!("{}  {} ({} songs)", list.id, list.name, list.songs.len());
                    self.say(format_args!("{line}"));
                }
            }
            Err(e) => self.say(format_args!("could not load playlists: {e:#}")),
        }
    }

    /// Replace the queue with the playlist's songs.
    fn playlist(&mut self, id: &str) {
        match self.catalog.playlist(id) {
            Ok(list) => {
                let tracks = list.tracks();
                self.controller.apply(Intent::ClearQueue);
                for track in &tracks {
                    self.controller.apply(Intent::Enqueue(track.clone()));
                }
                self.view = tracks;
                self.print_view(&format!("playlist: {}", list.name));
            }
            Err(e) => self.say(format_args!("could not load playlist {id}: {e:#}")),
        }
    }

    fn playlist_add(&mut self, playlist: &str, target: &Target) {
        let Some(track) = self.resolve(target) else {
            self.no_such(target);
            return;
        };
        match self.catalog.add_to_playlist(playlist, &track) {
            Ok(list) => self.say(format_args!(
                "added {} to {} ({} songs)",
                track.display_title(),
                list.name,
                list.songs.len()
            )),
            Err(e) => {
                tracing::warn!(playlist, track_id = %track.id, "playlist add failed: {e:#}");
                self.say(format_args!("could not add {}: {e:#}", track.display_title()));
            }
        }
    }

    /// Ids that are not in any local collection are passed through as-is.
    fn playlist_remove(&mut self, playlist: &str, target: &Target) {
        let song_id = match (self.resolve(target), target) {
            (Some(track), _) => track.id,
            (None, Target::Id(id)) => id.clone(),
            (None, Target::Row(_)) => {
                self.no_such(target);
                return;
            }
        };
        match self.catalog.remove_from_playlist(playlist, &song_id) {
            Ok(list) => {
                self.say(format_args!(
                    "removed {song_id} from {} ({} songs)",
                    list.name,
                    list.songs.len()
                ));
                self.view.retain(|t| t.id != song_id);
            }
            Err(e) => {
                tracing::warn!(playlist, song_id = %song_id, "playlist remove failed: {e:#}");
                self.say(format_args!("could not remove {song_id}: {e:#}"));
            }
        }
    }

    fn stats(&mut self) {
        let stats = match self.catalog.stats() {
            Ok(stats) => stats,
            Err(e) => {
                self.say(format_args!("could not load stats: {e:#}"));
                return;
            }
        };
        let mut lines = vec![format!("{} plays", stats.total_plays)];
        for (i, song) in stats.top_songs.iter().enumerate() {
            lines.push(format!(
                "{:>3}. {} - {}  ({} plays)",
                i + 1,
                song.filename,
                song.artist.as_deref().unwrap_or("Unknown Artist"),
                song.plays
            ));
        }
        let days: Vec<String> = stats
            .daily_activity
            .iter()
            .map(|day| format!("{} {}", day.name, day.plays))
            .collect();
        if !days.is_empty() {
            lines.push(format!("last 7 days: {}", days.join("  ")));
        }
        for line in lines {
            self.say(format_args!("{line}"));
        }
    }

    /// Row numbers index the last listing; ids are looked up everywhere.
    fn resolve(&self, target: &Target) -> Option<Track> {
        match target {
            Target::Row(row) => row.checked_sub(1).and_then(|i| self.view.get(i)).cloned(),
            Target::Id(id) => self
                .view
                .iter()
                .find(|t| &t.id == id)
                .or_else(|| self.controller.collections().find(id))
                .cloned(),
        }
    }

    fn no_such(&mut self, target: &Target) {
        match target {
            Target::Row(row) => self.say(format_args!("no row {row} in the last listing")),
            Target::Id(id) => self.say(format_args!("no track with id {id}")),
        }
    }

    fn print_view(&mut self, title: &str) {
        let current = self.controller.state().current_id().map(str::to_string);
        let mut lines = vec![format!("{title} ({} tracks)", self.view.len())];
        for (i, track) in self.view.iter().enumerate() {
            let marker = if current.as_deref() == Some(track.id.as_str()) { '>' } else { ' ' };
            let heart = if self.controller.is_liked(&track.id) { " *" } else { "" };
            lines.push(format!(
                "{marker}{:>3}. {} - {}  [{}]{heart}",
                i + 1,
                track.display_title(),
                track.display_artist(),
                format_time(track.duration_secs),
            ));
        }
        for line in lines {
            self.say(format_args!("{line}"));
        }
    }

    fn print_now_playing(&mut self) {
        let Some(track) = self.controller.state().current_track.clone() else {
            return;
        };
        let (r, g, b) = self.controller.theme().accent.to_rgb();
        self.say(format_args!(
            "\x1b[38;2;{r};{g};{b}mnow playing\x1b[0m {} - {}",
            track.display_title(),
            track.display_artist()
        ));
    }

    fn print_status(&mut self) {
        let state = self.controller.state().clone();
        let Some(track) = state.current_track.as_ref() else {
            self.say(format_args!("stopped, nothing selected"));
            return;
        };
        let mode = if state.is_playing { "playing" } else { "paused" };
        let mut line = format!(
            "{mode}: {} - {}  {} / {}  vol {:.0}%",
            track.display_title(),
            track.display_artist(),
            format_time(state.position_secs),
            format_time(state.duration_secs),
            state.volume * 100.0,
        );
        if self.controller.is_liked(&track.id) {
            line.push_str("  liked");
        }
        if let Some(mood) = self.controller.mood_filter() {
            line.push_str(&format!("  mood={mood}"));
        }
        if let Some(PlaybackError::Load { reason, .. }) = self.controller.last_error() {
            if !state.is_playing {
                line.push_str(&format!("  last error: {reason}"));
            }
        }
        self.say(format_args!("{line}"));
    }

    fn save_if_changed(&mut self) {
        let now = self.controller.persisted();
        if now == self.saved {
            return;
        }
        match now.save(&self.state_path) {
            Ok(()) => self.saved = now,
            Err(e) => tracing::warn!(path = ?self.state_path, "saving state failed: {e:#}"),
        }
    }

    fn say(&mut self, args: std::fmt::Arguments<'_>) {
        // Stdout going away is not worth failing the session over.
        let _ = writeln!(self.out, "{args}");
    }
}

impl<B: AudioBackend, W: Write> SessionDriver for Shell<B, W> {
    type Backend = B;
    type Command = String;

    fn controller(&self) -> &PlayerController<B> {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut PlayerController<B> {
        &mut self.controller
    }

    fn command(&mut self, line: String) -> Flow {
        self.handle_line(&line)
    }

    fn engine_message(&mut self, message: EngineMessage) {
        self.handle_engine(message);
    }

    fn after_input(&mut self) {
        self.save_if_changed();
    }
}

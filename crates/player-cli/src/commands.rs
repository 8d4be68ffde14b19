//! Line-oriented command grammar for the interactive shell.

use anyhow::{Result, anyhow, bail};

/// Step used by `ff` and `rw`.
pub const SKIP_SECS: f64 = 10.0;

/// A track reference typed by the user: a 1-based row of the last listing or a catalog id.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Row(usize),
    Id(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    List,
    Play(Target),
    /// Toggles between playing and paused.
    Pause,
    Stop,
    Next,
    Prev,
    Volume(f32),
    Seek(f64),
    SeekBy(f64),
    /// Show the queue.
    ShowQueue,
    Enqueue(Target),
    ClearQueue,
    /// Like or unlike; the current track when no target is given.
    Like(Option<Target>),
    Remove(Target),
    Mood(Option<String>),
    Playlists,
    Playlist(String),
    PlaylistAdd { playlist: String, target: Target },
    PlaylistRemove { playlist: String, target: Target },
    Stats,
    Status,
    Liked,
    Refresh,
    Name(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
list                 show the library (mood filter applied)
play <n|id>          play a track
pause                toggle play/pause
stop                 stop playback
next | prev          step through the queue (or library)
vol <0..1>           set volume
seek <secs>          jump to a position
ff | rw              skip 10 s forward / back
queue [<n|id>|clear] show, extend or clear the queue
like [n|id]          like/unlike (current track by default)
rm <n|id>            delete a track from the catalog
mood [tag]           filter the library by mood; no tag clears it
playlists            list playlists
playlist <id>        queue a playlist
playlist add <id> <n|id>  add a track to a playlist
playlist rm <id> <n|id>   take a track off a playlist
stats                listening history summary
liked                show liked tracks
status               show what is playing
refresh              reload the library
name <text>          set the display name
quit                 exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    let cmd = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "play" => Command::Play(target(required(arg, "play")?)),
        "pause" | "p" => Command::Pause,
        "stop" => Command::Stop,
        "next" | "n" => Command::Next,
        "prev" | "previous" => Command::Prev,
        "vol" | "volume" => {
            let raw = required(arg, "vol")?;
            let volume: f32 = raw
                .parse()
                .map_err(|_| anyhow!("volume must be a number, got {raw:?}"))?;
            Command::Volume(volume)
        }
        "seek" => Command::Seek(seconds(required(arg, "seek")?)?),
        "ff" => Command::SeekBy(SKIP_SECS),
        "rw" => Command::SeekBy(-SKIP_SECS),
        "queue" | "q" => match arg {
            None => Command::ShowQueue,
            Some(a) if a.eq_ignore_ascii_case("clear") => Command::ClearQueue,
            Some(a) => Command::Enqueue(target(a)),
        },
        "like" => Command::Like(arg.map(target)),
        "rm" | "remove" => Command::Remove(target(required(arg, "rm")?)),
        "mood" => Command::Mood(arg.map(str::to_string)),
        "playlists" => Command::Playlists,
        "playlist" => playlist(required(arg, "playlist")?)?,
        "stats" => Command::Stats,
        "status" | "s" => Command::Status,
        "liked" => Command::Liked,
        "refresh" => Command::Refresh,
        "name" => Command::Name(required(arg, "name")?.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}; try `help`"),
    };
    Ok(Some(cmd))
}

fn required<'a>(arg: Option<&'a str>, command: &str) -> Result<&'a str> {
    arg.ok_or_else(|| anyhow!("`{command}` needs an argument"))
}

/// `<id>`, `add <id> <n|id>` or `rm <id> <n|id>`.
fn playlist(arg: &str) -> Result<Command> {
    let words: Vec<&str> = arg.split_whitespace().collect();
    let sub = words.first().map(|w| w.to_ascii_lowercase()).unwrap_or_default();
    let edit = match sub.as_str() {
        "add" => true,
        "rm" | "remove" => false,
        _ => return Ok(Command::Playlist(arg.to_string())),
    };
    let [_, playlist, track] = words[..] else {
        bail!("usage: playlist {sub} <playlist-id> <n|id>");
    };
    let playlist = playlist.to_string();
    let target = target(track);
    Ok(if edit {
        Command::PlaylistAdd { playlist, target }
    } else {
        Command::PlaylistRemove { playlist, target }
    })
}

fn target(arg: &str) -> Target {
    match arg.parse::<usize>() {
        Ok(row) if row > 0 => Target::Row(row),
        _ => Target::Id(arg.to_string()),
    }
}

/// Seconds as `90`, `90.5` or `m:ss`.
fn seconds(arg: &str) -> Result<f64> {
    let parsed = match arg.split_once(':') {
        Some((m, s)) => m
            .parse::<u64>()
            .ok()
            .zip(s.parse::<f64>().ok())
            .map(|(m, s)| m as f64 * 60.0 + s),
        None => arg.parse::<f64>().ok(),
    };
    parsed
        .filter(|s| s.is_finite())
        .ok_or_else(|| anyhow!("position must be seconds or m:ss, got {arg:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn targets_are_rows_or_ids() {
        assert_eq!(cmd("play 3"), Command::Play(Target::Row(3)));
        assert_eq!(cmd("play 0"), Command::Play(Target::Id("0".to_string())));
        assert_eq!(
            cmd("PLAY 65f1c0ffee"),
            Command::Play(Target::Id("65f1c0ffee".to_string()))
        );
        assert_eq!(cmd("like"), Command::Like(None));
        assert_eq!(cmd("like 2"), Command::Like(Some(Target::Row(2))));
    }

    #[test]
    fn queue_forms() {
        assert_eq!(cmd("queue"), Command::ShowQueue);
        assert_eq!(cmd("queue clear"), Command::ClearQueue);
        assert_eq!(cmd("queue 4"), Command::Enqueue(Target::Row(4)));
    }

    #[test]
    fn numeric_arguments() {
        assert_eq!(cmd("vol 0.3"), Command::Volume(0.3));
        assert_eq!(cmd("seek 75"), Command::Seek(75.0));
        assert_eq!(cmd("seek 1:15"), Command::Seek(75.0));
        assert_eq!(cmd("ff"), Command::SeekBy(10.0));
        assert_eq!(cmd("rw"), Command::SeekBy(-10.0));
        assert!(parse("vol loud").is_err());
        assert!(parse("seek a:b").is_err());
        assert!(parse("seek inf").is_err());
    }

    #[test]
    fn mood_and_text_arguments_keep_spaces() {
        assert_eq!(cmd("mood"), Command::Mood(None));
        assert_eq!(cmd("mood late night"), Command::Mood(Some("late night".to_string())));
        assert_eq!(cmd("name  DJ Test "), Command::Name("DJ Test".to_string()));
    }

    #[test]
    fn playlist_forms() {
        assert_eq!(cmd("playlist p1"), Command::Playlist("p1".to_string()));
        assert_eq!(
            cmd("playlist add p1 3"),
            Command::PlaylistAdd {
                playlist: "p1".to_string(),
                target: Target::Row(3),
            }
        );
        assert_eq!(
            cmd("playlist RM p1 65f1c0ffee"),
            Command::PlaylistRemove {
                playlist: "p1".to_string(),
                target: Target::Id("65f1c0ffee".to_string()),
            }
        );
        assert!(parse("playlist add p1").is_err());
        assert!(parse("playlist rm p1 2 extra").is_err());
        assert_eq!(cmd("stats"), Command::Stats);
    }

    #[test]
    fn missing_and_unknown() {
        assert!(parse("play").is_err());
        assert!(parse("rm").is_err());
        assert!(parse("dance").is_err());
    }
}

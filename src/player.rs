//! External player process management

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;

use crate::models::Channel;

pub const DEFAULT_PLAYER: &str = "ffplay";

/// Reported from the player's helper threads.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Log(String),
    Exited { name: String, code: Option<i32> },
}

/// Empty config means ffplay. On Windows common install locations are searched.
pub fn resolve_program(configured: &str) -> String {
    let player = configured.trim();
    let player = if player.is_empty() { DEFAULT_PLAYER } else { player };

    #[cfg(target_os = "windows")]
    {
        let lower = player.to_lowercase();
        let candidates: &[&str] = if lower == "vlc" || lower == "vlc.exe" {
            &[
                r"C:\Program Files\VideoLAN\VLC\vlc.exe",
                r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe",
            ]
        } else if lower == "mpv" || lower == "mpv.exe" {
            &[r"C:\Program Files\mpv\mpv.exe", r"C:\mpv\mpv.exe"]
        } else if lower == "ffplay" || lower == "ffplay.exe" {
            &[r"C:\ffmpeg\bin\ffplay.exe", r"C:\Program Files\ffmpeg\bin\ffplay.exe"]
        } else {
            &[]
        };
        if let Some(found) = candidates.iter().find(|p| std::path::Path::new(p).exists()) {
            return found.to_string();
        }
    }

    player.to_string()
}

/// Window title plus stream arguments for the players we know; anything else gets the bare URL.
pub fn player_args(program: &str, channel: &Channel, user_agent: &str) -> Vec<String> {
    let lower = program.to_lowercase();
    let url = channel.channel_url.clone();
    let title = channel.name.clone();

    if lower.contains("ffplay") {
        let mut args = vec![
            url.clone(),
            "-autoexit".to_string(),
            "-window_title".to_string(),
            title,
            "-user_agent".to_string(),
            user_agent.to_string(),
        ];
        if url.starts_with("http") {
            args.extend([
                "-reconnect".to_string(),
                "1".to_string(),
                "-reconnect_streamed".to_string(),
                "1".to_string(),
            ]);
        }
        args
    } else if lower.contains("mpv") {
        vec![
            url,
            format!("--title={}", title),
            "--cache=yes".to_string(),
            "--keep-open=yes".to_string(),
            "--ytdl=no".to_string(),
            format!("--user-agent={}", user_agent),
        ]
    } else if lower.contains("vlc") {
        vec![
            url,
            format!("--meta-title={}", title),
            "--http-reconnect".to_string(),
            format!("--http-user-agent={}", user_agent),
        ]
    } else {
        vec![url]
    }
}

/// Tracks the launched player so single-window mode can replace it.
#[derive(Debug, Default)]
pub struct PlayerManager {
    current: Option<Child>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill and reap the tracked player, if any.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(mut child) => {
                let _ = child.kill();
                let _ = child.wait();
                true
            }
            None => false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.current.is_some()
    }

    /// Spawn the player for `channel`. Stderr lines and non-zero exits are
    /// forwarded to `notify` from helper threads. Returns the child PID.
    pub fn launch<F>(
        &mut self,
        configured: &str,
        single_window: bool,
        channel: &Channel,
        notify: F,
    ) -> std::io::Result<u32>
    where
        F: Fn(PlayerEvent) + Send + Clone + 'static,
    {
        if single_window && self.stop() {
            notify(PlayerEvent::Log("[PLAY] Single window mode - closing previous player".to_string()));
        }

        let program = resolve_program(configured);
        let user_agent = format!("IPTVBrowser/{}", env!("CARGO_PKG_VERSION"));
        let mut cmd = Command::new(&program);

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            if program.to_lowercase().contains("ffplay") {
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }

        cmd.args(player_args(&program, channel, &user_agent))
            .stderr(Stdio::piped())
            .stdout(Stdio::null());

        tracing::info!("Launching {} for {}", program, channel.name);
        let mut child = cmd.spawn()?;
        let pid = child.id();

        if let Some(stderr) = child.stderr.take() {
            let notify = notify.clone();
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        notify(PlayerEvent::Log(format!("[PLAYER] {}", line)));
                    }
                }
            });
        }

        if single_window {
            self.current = Some(child);
        } else {
            let name = channel.name.clone();
            thread::spawn(move || match child.wait() {
                Ok(status) if !status.success() => notify(PlayerEvent::Exited {
                    name,
                    code: status.code(),
                }),
                Ok(_) => {}
                Err(e) => notify(PlayerEvent::Log(format!("[ERROR] Failed to wait for player: {}", e))),
            });
        }

        Ok(pid)
    }
}

impl Drop for PlayerManager {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Outbound collaborators the bridge talks to.
//!
//! All calls are fire-and-forget: the worker never waits for a refresh to
//! finish, and implementations must not block for long.

use std::sync::Arc;

/// Site notes sync.
pub trait NotesService: Send + Sync {
    fn refresh_notes(&self, character: &str);
}

/// Friend request sync.
pub trait FriendRequestService: Send + Sync {
    fn refresh_pending_requests(&self);
    fn refresh_outgoing_requests(&self);
}

/// The chat shell: browser, notification window and user command bus.
pub trait ChatShell: Send + Sync {
    fn open_external_link(&self, url: &str);
    fn show_notification_window(&self);
    fn send_user_command(&self, command: &str, args: &[String]);
}

/// Everything the dispatcher needs from outside the core.
#[derive(Clone)]
pub struct BridgeServices {
    pub notes: Arc<dyn NotesService>,
    pub friend_requests: Arc<dyn FriendRequestService>,
    pub shell: Arc<dyn ChatShell>,
}

impl BridgeServices {
    pub fn new(
        notes: Arc<dyn NotesService>,
        friend_requests: Arc<dyn FriendRequestService>,
        shell: Arc<dyn ChatShell>,
    ) -> Self {
        Self {
            notes,
            friend_requests,
            shell,
        }
    }

    /// Services that only log what they were asked to do.
    pub fn logging(open_links: bool) -> Self {
        Self {
            notes: Arc::new(LoggingSync),
            friend_requests: Arc::new(LoggingSync),
            shell: Arc::new(SystemShell::new(open_links)),
        }
    }
}

/// Stand-in for the notes and friend request services when none are wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSync;

impl NotesService for LoggingSync {
    fn refresh_notes(&self, character: &str) {
        tracing::info!(character, "notes refresh requested");
    }
}

impl FriendRequestService for LoggingSync {
    fn refresh_pending_requests(&self) {
        tracing::info!("pending friend requests refresh requested");
    }

    fn refresh_outgoing_requests(&self) {
        tracing::info!("outgoing friend requests refresh requested");
    }
}

/// Shell that opens links in the OS browser and logs everything else.
#[derive(Debug, Clone, Copy)]
pub struct SystemShell {
    open_links: bool,
}

impl SystemShell {
    pub fn new(open_links: bool) -> Self {
        Self { open_links }
    }
}

impl ChatShell for SystemShell {
    fn open_external_link(&self, url: &str) {
        if !self.open_links {
            tracing::info!(url, "link opening disabled");
            return;
        }
        if let Err(e) = open_url(url) {
            tracing::warn!(url, error = %e, "failed to open link");
        }
    }

    fn show_notification_window(&self) {
        tracing::info!("notification window requested");
    }

    fn send_user_command(&self, command: &str, args: &[String]) {
        tracing::info!(command, ?args, "user command");
    }
}

/// Open a URL in the system's default browser.
pub fn open_url(url: &str) -> Result<(), String> {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "linux")]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn();

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let result: Result<std::process::Child, std::io::Error> = Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Opening URLs is not supported on this platform",
    ));

    result
        .map(|_| ())
        .map_err(|e| format!("Failed to open browser: {}", e))
}

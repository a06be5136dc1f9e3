use std::process::Command;
use std::time::Duration;

use tracing::{debug, error, info};

/// Companion applications (the recording app) that run alongside the
/// installation. Failures here are logged and tolerated: a lost
/// recording is not worth restarting the machine over.
pub struct CompanionApps {
    names: Vec<String>,
    is_open: bool,
}

impl CompanionApps {
    /// Starts from a known state: whatever was left running from a
    /// previous session is closed first.
    pub fn new(names: Vec<String>) -> Self {
        let mut apps = Self {
            names,
            is_open: true,
        };
        apps.close();
        std::thread::sleep(Duration::from_secs(3));
        apps
    }

    pub fn open(&mut self) {
        if self.is_open {
            return;
        }
        for name in &self.names {
            run_script(&format!(r#"tell application "{name}" to activate"#));
        }
        self.is_open = true;
    }

    pub fn close(&mut self) {
        if !self.is_open {
            return;
        }
        for name in &self.names {
            run_script(&format!(
                r#"if application "{name}" is running then
    tell application "{name}" to quit
end if"#
            ));
        }
        self.is_open = false;
    }

    /// Periodic restart keeps the recording app from accumulating a
    /// multi-day session.
    pub fn restart(&mut self) {
        info!("restarting companion apps");
        self.close();
        std::thread::sleep(Duration::from_secs(3));
        self.open();
    }
}

fn run_script(script: &str) {
    if !cfg!(target_os = "macos") {
        debug!("companion app control is only wired up on macOS");
        return;
    }
    match Command::new("osascript").args(["-e", script]).status() {
        Ok(status) if status.success() => {}
        Ok(status) => error!("osascript exited with {status}"),
        Err(e) => error!("osascript failed to run: {e}"),
    }
}

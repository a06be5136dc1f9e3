use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rowlight::apps::CompanionApps;
use rowlight::midi::MidiOut;
use rowlight::serial::SerialLink;
use rowlight::web::{self, WebService};
use rowlight::{Composition, Config, Drone, Error, Player, Scheduler, Task, ToneRow};

/// Everything the scheduler's tasks reach for.
struct App {
    player: Player<MidiOut, SerialLink>,
    companions: CompanionApps,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rowlight.ron".into());
    let config = match Config::load_or_default(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        error!("{e}");
        if matches!(e, Error::Device(_)) {
            restart_host(config.restart_command.as_deref());
        }
        std::process::exit(1);
    }
}

/// A device fault leaves hardware state nobody on this side of the
/// cable can reason about, so the bound recovery is a host restart, not
/// a reconnect.
fn restart_host(command: Option<&str>) {
    match command {
        Some(cmd) => {
            info!("restarting the host");
            if let Err(e) = Command::new("sh").args(["-c", cmd]).status() {
                error!("restart command failed: {e}");
            }
        }
        None => error!("no restart command configured; leaving the restart to the supervisor"),
    }
}

fn run(config: &Config) -> Result<(), Error> {
    let midi = MidiOut::open()?;
    let serial = SerialLink::open(config.serial_port.as_deref())?;
    let drone = Drone::new(
        config.drone.channel,
        config.drone.note,
        config.drone.velocity,
    );
    let player = Player::new(
        midi,
        serial,
        drone,
        config.channel,
        config.velocity,
        config.bpm,
    );

    let mut companions = CompanionApps::new(config.companion_apps.clone());
    companions.open();

    let web = WebService::new(&config.web);

    let max_quiet = config.max_quiet_secs;
    let quiet_count = config.quiet_window_count;
    let mut scheduler = Scheduler::new(vec![
        Task::every(
            Duration::from_secs(config.app_restart_secs),
            |app: &mut App| {
                app.companions.restart();
                Ok(())
            },
        ),
        Task::when(
            move |app: &App| app.player.quiet_for(max_quiet),
            move |app: &mut App| {
                app.player
                    .play_quiet_window(quiet_count, &mut rand::thread_rng())
            },
        ),
    ]);

    let mut app = App { player, companions };

    loop {
        let assignments = web.fetch_rows(|| {
            app.player.drone_on()?;
            scheduler.check(&mut app)
        })?;

        if assignments.is_empty() {
            scheduler.check(&mut app)?;
            app.player.drone_on()?;
            continue;
        }

        app.player.drone_off()?;
        for assignment in assignments {
            let row = web::parse_note_row(&assignment.note_row).unwrap_or_else(|_| {
                error!("invalid tone row from the service; substituting a random one");
                ToneRow::random(&mut rand::thread_rng())
            });
            info!("row {}: {row}", assignment.id);

            let comp =
                Composition::generate(&row, config.bpm, assignment.id, &mut rand::thread_rng());

            // The service hears what is about to play before a note
            // sounds, so the gallery's display stays in step.
            web.announce_played(&comp, || {
                app.player.drone_on()?;
                scheduler.check(&mut app)
            })?;

            app.player.drone_off()?;
            app.player.play(&comp)?;

            web.notify_composition_end(comp.id, || {
                app.player.drone_on()?;
                scheduler.check(&mut app)
            })?;
        }
    }
}

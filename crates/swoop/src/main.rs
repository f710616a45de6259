use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use structopt::StructOpt;
use swoop::{
    config::Config,
    geometry::{Point, Rect, Size, WindowId, WorkspaceId},
    layout::LayoutCommand,
    metrics,
    reactor::{Event, Reactor},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_tree::time::UtcDateTime;

/// Replays a scripted tiling session on a simulated clock and logs every
/// frame.
#[derive(StructOpt)]
struct Opt {
    /// Configuration file. Defaults are used when absent.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Number of windows to open.
    #[structopt(long, default_value = "4")]
    windows: u64,

    /// Simulated frame rate.
    #[structopt(long, default_value = "60")]
    fps: u32,

    /// Work area width and height.
    #[structopt(long, default_value = "1920")]
    width: i32,
    #[structopt(long, default_value = "1080")]
    height: i32,

    /// Print span timing histograms at exit.
    #[structopt(long)]
    timing: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(metrics::timing_layer())
        .with(
            tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true)
                .with_timer(UtcDateTime::default()),
        )
        .init();
    install_panic_hook();

    let opt = Opt::from_args();
    let mut config = match &opt.config {
        Some(path) => Config::read(path)?,
        None => Config::default(),
    };
    for issue in config.validate() {
        warn!("config: {issue}");
    }
    let fixes = config.auto_fix_values();
    if fixes > 0 {
        warn!(fixes, "corrected invalid config values");
    }

    let bounds = Rect::new(0, 0, opt.width, opt.height);
    let mut sim = Simulation::new(Reactor::new(&config, bounds), opt.fps.max(1));
    for event in script(opt.windows, bounds) {
        sim.send(event);
        sim.run_until_finished();
    }

    if opt.timing {
        if let Some(report) = metrics::timing_report() {
            println!("{report}");
        }
    }
    Ok(())
}

/// Drives a reactor the way a compositor would, with a fake clock.
struct Simulation {
    reactor: Reactor,
    now: Instant,
    frame_interval: Duration,
    frames: u64,
}

impl Simulation {
    fn new(reactor: Reactor, fps: u32) -> Self {
        Simulation {
            reactor,
            now: Instant::now(),
            frame_interval: Duration::from_secs(1) / fps,
            frames: 0,
        }
    }

    fn send(&mut self, event: Event) {
        info!(?event, "event");
        let response = self.reactor.handle_event(event, self.now);
        for snapped in response.snapped {
            info!(wid = ?snapped.wid, frame = ?snapped.frame, "snap");
        }
    }

    fn run_until_finished(&mut self) {
        loop {
            self.now += self.frame_interval;
            self.frames += 1;
            let update = self.reactor.frame(self.now);
            for window in &update.windows {
                info!(
                    frame = self.frames,
                    wid = ?window.wid,
                    rect = ?window.frame,
                    transform = ?window.transform,
                );
            }
            for exiting in &update.exiting {
                info!(frame = self.frames, wid = ?exiting.wid, alpha = exiting.alpha, "exiting");
            }
            if update.finished {
                info!(frames = self.frames, "settled");
                break;
            }
        }
    }
}

fn script(windows: u64, bounds: Rect) -> Vec<Event> {
    let ids: Vec<WindowId> = (1..=windows).map(WindowId::new).collect();
    let mut events = vec![];
    for (i, &wid) in ids.iter().enumerate() {
        // Sweep the cursor across the screen so smart-split has something to
        // work with.
        let x = bounds.x + bounds.width * (i as i32 + 1) / (ids.len() as i32 + 1);
        let position = Point::new(x, bounds.center().y);
        events.push(Event::CursorMoved { position });
        events.push(Event::WindowMapped { wid });
    }
    let first = ids.first().copied();
    events.push(Event::Command { command: LayoutCommand::ToggleSplit, target: None });
    events.push(Event::Command { command: LayoutCommand::SwapSibling, target: first });
    events.push(Event::Command {
        command: LayoutCommand::TogglePseudotile { reported_size: Some(Size::new(640, 480)) },
        target: first,
    });
    events.push(Event::WorkareaChanged {
        bounds: Rect::new(bounds.x, bounds.y + 30, bounds.width, bounds.height - 30),
    });
    events.push(Event::WorkspaceChanged { workspace: WorkspaceId::new(1) });
    events.push(Event::WorkspaceChanged { workspace: WorkspaceId::new(0) });
    for &wid in ids.iter().rev() {
        events.push(Event::WindowUnmapped { wid });
    }
    events
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of unwinding through the simulation loop.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));

    if std::env::var("RUST_BACKTRACE").is_err() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}

/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

use std::io::stdout;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;

use sensorview::app::App;
use sensorview::backend::{Adapter, HwmonBackend, SensorBackend};
use sensorview::config::{config_path, load_settings, save_settings_to, validate_settings, ViewerSettings};
use sensorview::discovery::Sensors;
use sensorview::events::handle_key_event;
use sensorview::logger;
use sensorview::sensors_conf::SensorsConfig;
use sensorview::snapshot::Snapshot;
use sensorview::ui::ui;

#[derive(Parser, Debug, Default, PartialEq)]
#[command(name = "sensorview")]
#[command(version)]
#[command(about = "Sensorview - live hardware sensor tree for Linux")]
#[command(long_about = "Sensorview - live hardware sensor tree for Linux

Shows every hwmon chip with its features and subfeatures, refreshed on a
fixed interval. Without --dump or --json an interactive viewer is started.

FILES:
    ~/.config/sensorview/config.json       Viewer settings
    ~/.local/state/sensorview/logs.json    Event log (with --logging)")]
struct CliArgs {
    /// Print the sensor tree once and exit
    #[arg(long)]
    dump: bool,

    /// Print the sensor tree once as JSON and exit
    #[arg(long, conflicts_with = "dump")]
    json: bool,

    /// Only show chips matching PATTERN (e.g. nct6775-*)
    #[arg(long, value_name = "PATTERN")]
    chip: Option<String>,

    /// Refresh interval in milliseconds (>= 100)
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Chip configuration file with label/ignore statements
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// sysfs root (default /sys)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Write JSON-lines events to the state directory
    #[arg(long)]
    logging: bool,

    /// Store the effective settings in the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl CliArgs {
    /// Command-line flags take precedence over the settings file.
    fn apply(&self, settings: &mut ViewerSettings) {
        if let Some(ms) = self.interval {
            settings.refresh_interval_ms = ms;
        }
        if let Some(chip) = &self.chip {
            settings.chip_filter = Some(chip.clone());
        }
        if let Some(config) = &self.config {
            settings.sensors_config = Some(config.clone());
        }
        if let Some(root) = &self.root {
            settings.sysfs_root = root.clone();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    if cli.logging {
        logger::init_logging();
        let args: Vec<String> = std::env::args().collect();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }

    let mut settings = match load_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };
    cli.apply(&mut settings);
    if let Err(e) = validate_settings(&settings) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    // `sensorview --save-config` keeps the merged flags for later runs
    if cli.save_config {
        let path = config_path();
        save_settings_to(&path, &settings).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote settings to {}", path.display());
        return Ok(());
    }

    let chip_filter = settings.chip_pattern().map_err(anyhow::Error::msg)?;
    let chip_config = match &settings.sensors_config {
        Some(path) => Some(
            SensorsConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        ),
        None => None,
    };

    let mut adapter = Adapter::new(HwmonBackend::new(&settings.sysfs_root));
    if let Err(err) = adapter.initialize() {
        eprintln!("error: {}", err);
        logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        std::process::exit(1);
    }

    let mut sensors = Sensors::new(&adapter).with_chip_filter(chip_filter);
    if let Some(conf) = &chip_config {
        sensors = sensors.with_config(conf);
    }

    // One-shot output: `sensorview --dump` / `sensorview --json`
    if cli.dump || cli.json {
        let snapshot = Snapshot::build(&sensors)?;
        if cli.json {
            println!("{}", snapshot.to_json()?);
        } else {
            println!("{}", snapshot.to_text().trim_end());
        }
        return Ok(());
    }

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    logger::log_event("tui_start", serde_json::json!({
        "interval_ms": settings.refresh_interval_ms,
        "root": settings.sysfs_root,
    }));
    let mut app = App::new(settings.refresh_interval(), settings.show_info_column);
    let res = run_app(&mut terminal, &mut app, &sensors);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
        logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        std::process::exit(1);
    }

    logger::log_event("shutdown", serde_json::json!({
        "rebuilds": app.refresher.rebuilds(),
        "dropped": app.refresher.drops(),
    }));
    Ok(())
}

fn run_app<B: SensorBackend>(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    sensors: &Sensors<'_, B>,
) -> anyhow::Result<()> {
    app.tick(Instant::now(), sensors)?;

    loop {
        // draw
        terminal.draw(|f| ui(f, app))?;

        // wait for input until the next refresh is due
        let timeout = app.time_until_refresh(Instant::now());
        if event::poll(timeout).unwrap_or(false) {
            if let Event::Key(key_event) = event::read()? {
                if handle_key_event(app, key_event)? {
                    return Ok(());
                }
            }
        }

        app.tick(Instant::now(), sensors)?;
    }
}

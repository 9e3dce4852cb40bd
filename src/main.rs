use anyhow::Context;
use clap::Parser;
use cyberfield::bringup::isolated;
use cyberfield::config::{load_settings, project_paths, save_settings_atomic, Settings};
use cyberfield::{app, logging};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Drifting particle constellation that follows your mouse")]
struct Args {
    /// settings file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// logical units per braille dot (bigger = sparser field)
    #[arg(long)]
    scale: Option<f32>,

    /// fixed RNG seed for a reproducible field
    #[arg(long)]
    seed: Option<u64>,

    /// draw in plain white
    #[arg(long)]
    no_color: bool,

    /// show the status line on start
    #[arg(long)]
    hud: bool,

    /// keep the field down to a handful of particles
    #[arg(long)]
    reduced_motion: bool,

    /// log file (defaults to the platform data dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// log filter, e.g. "info" or "cyberfield=debug"; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// write the effective settings to the settings file and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn apply(&self, s: &mut Settings) {
        if let Some(fps) = self.fps {
            s.fps_cap = fps;
        }
        if let Some(scale) = self.scale {
            s.units_per_px = scale;
        }
        if self.seed.is_some() {
            s.seed = self.seed;
        }
        if self.no_color {
            s.enable_color = false;
        }
        if self.hud {
            s.show_hud = true;
        }
        if self.reduced_motion {
            s.reduced_motion = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = match project_paths() {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("warning: {e}");
            None
        }
    };

    let log_path = args
        .log_file
        .clone()
        .or_else(|| paths.as_ref().map(|p| p.log_path.clone()));
    match log_path {
        Some(path) => {
            if let Err(e) = logging::init(&path, &args.log_level) {
                eprintln!("warning: logging disabled: {e:#}");
            }
        }
        None => eprintln!("warning: logging disabled: no log file location"),
    }

    let settings_path = args
        .config
        .clone()
        .or_else(|| paths.as_ref().map(|p| p.settings_path.clone()));

    let mut settings = settings_path
        .as_deref()
        .and_then(|p| isolated("settings", || load_settings(p)))
        .unwrap_or_default();
    args.apply(&mut settings);
    settings.validate().context("invalid settings")?;

    if args.write_config {
        let path = settings_path.context("no settings file location, pass --config")?;
        save_settings_atomic(&path, &settings)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    app::run(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let args = Args::parse_from([
            "cyberfield",
            "--fps",
            "30",
            "--scale",
            "2.5",
            "--seed",
            "9",
            "--no-color",
            "--reduced-motion",
        ]);
        let mut s = Settings::default();
        args.apply(&mut s);
        assert_eq!(s.fps_cap, 30);
        assert_eq!(s.units_per_px, 2.5);
        assert_eq!(s.seed, Some(9));
        assert!(!s.enable_color);
        assert!(s.reduced_motion);
        assert!(!s.show_hud);
    }

    #[test]
    fn absent_flags_leave_settings_alone() {
        let args = Args::parse_from(["cyberfield"]);
        let mut s = Settings::default();
        s.seed = Some(4);
        args.apply(&mut s);
        assert_eq!(s.seed, Some(4));
        assert_eq!(s.fps_cap, 60);
        assert_eq!(args.log_level, "info");
    }
}

use anyhow::Result;
use clap::Parser;
use md_core::config::SAMPLE_RATE;
use md_core::settings::Settings;

pub mod batch;
pub mod cli;
pub mod monitor;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Listing des périphériques
    if cli.list_devices {
        return list_devices();
    }

    // 4. Charger la config + overrides CLI
    let mut settings = resolve_settings(&cli)?;
    cli.apply_overrides(&mut settings);

    // 5. Mode fichier ou temps réel
    if let Some(ref path) = cli.file {
        return batch::run_batch(path, &settings, cli.json);
    }
    pipeline::run_live(&settings, cli.show_features)
}

/// Print the input devices of the default host.
fn list_devices() -> Result<()> {
    let devices = md_audio::capture::list_input_devices(SAMPLE_RATE)?;
    if devices.is_empty() {
        println!("Aucun périphérique d'entrée.");
    }
    for d in &devices {
        println!(
            "{} {}  ({} canaux max, f32 @ {SAMPLE_RATE} Hz : {})",
            if d.is_default { "*" } else { " " },
            d.name,
            d.max_channels,
            if d.supports_rate { "oui" } else { "non" }
        );
    }
    Ok(())
}

/// Load the settings file, or fall back to defaults if it does not exist.
fn resolve_settings(cli: &cli::Cli) -> Result<Settings> {
    if cli.config.exists() {
        md_core::settings::load_settings(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(Settings::default())
    }
}

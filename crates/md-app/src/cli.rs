use std::path::PathBuf;

use clap::Parser;
use md_core::settings::Settings;

/// moodetect : real-time music mood (arousal / valence) detection.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/moodetect.toml.
    #[arg(short, long, default_value = "config/moodetect.toml")]
    pub config: PathBuf,

    /// Dossier du modèle arousal (remplace [models] arousal_dir).
    #[arg(long)]
    pub arousal: Option<PathBuf>,

    /// Dossier du modèle valence (remplace [models] valence_dir).
    #[arg(long)]
    pub valence: Option<PathBuf>,

    /// Renvoyer l'entrée audio vers la sortie par défaut.
    #[arg(long, default_value_t = false)]
    pub passthrough: bool,

    /// Périphérique d'entrée (sous-chaîne du nom).
    #[arg(long)]
    pub device: Option<String>,

    /// Lister les périphériques d'entrée puis quitter.
    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Analyse offline d'un fichier audio (mp3, flac, ogg, wav, aac, m4a).
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Sortie JSON lines en mode fichier.
    #[arg(long, default_value_t = false, requires = "file")]
    pub json: bool,

    /// Afficher aussi les features rythmiques dans le moniteur.
    #[arg(long, default_value_t = false)]
    pub show_features: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply the command-line overrides on top of the file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.arousal {
            settings.arousal_dir.clone_from(dir);
        }
        if let Some(ref dir) = self.valence {
            settings.valence_dir.clone_from(dir);
        }
        if self.passthrough {
            settings.passthrough = true;
        }
        if let Some(ref name) = self.device {
            settings.input_device = Some(name.clone());
        }
    }
}
